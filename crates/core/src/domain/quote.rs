use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::OptimizationError;

/// A single pricing question: "what discount maximizes margin for this quote?"
///
/// Field names on the wire follow the columns of the historical dataset so the same record can
/// be fed to the models without renaming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Fraction (0..=1) of the last observed conversion rate a candidate must reach.
    #[serde(rename = "limite")]
    pub acceptance_fraction: f64,
    #[serde(rename = "Year")]
    pub year: i32,
    pub day_of_year: u16,
    #[serde(rename = "FaixaPeso")]
    pub weight_band: String,
    #[serde(rename = "ProdutoFamilia")]
    pub product_family: String,
    #[serde(rename = "ProdutoDescricao")]
    pub product_description: String,
    #[serde(rename = "ProdutoGrupoSOP")]
    pub product_group_sop: String,
    #[serde(rename = "Canal")]
    pub channel: String,
    #[serde(rename = "EmpresaNome")]
    pub company_name: String,
    #[serde(rename = "ClienteCNPJCPF")]
    pub customer_document: String,
    #[serde(rename = "nuPrecoGerenciaTotal")]
    pub reference_price: Decimal,
}

impl QuoteRequest {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if !self.acceptance_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.acceptance_fraction)
        {
            return Err(OptimizationError::InvalidRequest(format!(
                "limite must be within 0..=1, got {}",
                self.acceptance_fraction
            )));
        }

        if !(1..=366).contains(&self.day_of_year) {
            return Err(OptimizationError::InvalidRequest(format!(
                "day_of_year must be within 1..=366, got {}",
                self.day_of_year
            )));
        }

        if self.reference_price < Decimal::ZERO {
            return Err(OptimizationError::InvalidRequest(format!(
                "nuPrecoGerenciaTotal must not be negative, got {}",
                self.reference_price
            )));
        }

        if self.product_description.trim().is_empty() {
            return Err(OptimizationError::InvalidRequest(
                "ProdutoDescricao is required".to_string(),
            ));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::fixtures::quote_request;
    use super::QuoteRequest;
    use crate::errors::OptimizationError;

    #[test]
    fn deserializes_wire_field_names() {
        let payload = r#"{
            "limite": 0.8,
            "Year": 2025,
            "day_of_year": 168,
            "FaixaPeso": "0-50kg",
            "ProdutoFamilia": "TUBOS",
            "ProdutoDescricao": "TUBO 1/2' SCH40",
            "ProdutoGrupoSOP": "TUBO CONDUCAO",
            "Canal": "INSIDE SALES",
            "EmpresaNome": "ACOTUBO SP",
            "ClienteCNPJCPF": "12345678000190",
            "nuPrecoGerenciaTotal": 1000.0
        }"#;

        let request: QuoteRequest = serde_json::from_str(payload).expect("request parses");

        assert_eq!(request.acceptance_fraction, 0.8);
        assert_eq!(request.product_description, "TUBO 1/2' SCH40");
        assert_eq!(request.reference_price, Decimal::new(1000, 0));
    }

    #[test]
    fn accepts_boundary_values() {
        let mut request = quote_request("TUBO");
        request.acceptance_fraction = 1.0;
        request.day_of_year = 366;
        request.reference_price = Decimal::ZERO;

        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn rejects_acceptance_fraction_outside_unit_interval() {
        let mut request = quote_request("TUBO");
        request.acceptance_fraction = 1.2;

        let error = request.validate().expect_err("limite above 1 should fail");
        assert!(matches!(error, OptimizationError::InvalidRequest(ref message) if message.contains("limite")));

        request.acceptance_fraction = f64::NAN;
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_day_of_year_zero() {
        let mut request = quote_request("TUBO");
        request.day_of_year = 0;

        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_negative_reference_price_and_blank_product() {
        let mut request = quote_request("TUBO");
        request.reference_price = Decimal::new(-1, 0);
        assert!(request.validate().is_err());

        let request = quote_request("   ");
        assert!(request.validate().is_err());
    }
}
