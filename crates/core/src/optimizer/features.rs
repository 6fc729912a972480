use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::history::HistoricalRecord;
use crate::domain::quote::QuoteRequest;
use crate::errors::OptimizationError;
use crate::optimizer::candidates::CandidateSpace;

/// Model-facing column names, in the order the training frames used.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "Year",
    "day_of_year",
    "FaixaPeso",
    "ProdutoFamilia",
    "ProdutoDescricao",
    "ProdutoGrupoSOP",
    "Canal",
    "EmpresaNome",
    "ClienteCNPJCPF",
    "nuPrecoGerenciaTotal",
    "totalSold",
    "TotalQuoted",
    "Desconto",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

pub fn column_kind(column: &str) -> Option<FeatureKind> {
    match column {
        "Year" | "day_of_year" | "nuPrecoGerenciaTotal" | "totalSold" | "TotalQuoted"
        | "Desconto" => Some(FeatureKind::Numeric),
        "FaixaPeso" | "ProdutoFamilia" | "ProdutoDescricao" | "ProdutoGrupoSOP" | "Canal"
        | "EmpresaNome" | "ClienteCNPJCPF" => Some(FeatureKind::Categorical),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureValue<'a> {
    Numeric(f64),
    Categorical(&'a str),
}

/// One model input row: the request as sent, the product's volume history, and one discount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureRecord<'a> {
    pub request: &'a QuoteRequest,
    pub reference_price: f64,
    pub total_sold: f64,
    pub total_quoted: f64,
    pub discount_pct: f64,
}

impl<'a> FeatureRecord<'a> {
    pub fn value(&self, column: &str) -> Option<FeatureValue<'a>> {
        let request = self.request;
        let value = match column {
            "Year" => FeatureValue::Numeric(f64::from(request.year)),
            "day_of_year" => FeatureValue::Numeric(f64::from(request.day_of_year)),
            "FaixaPeso" => FeatureValue::Categorical(&request.weight_band),
            "ProdutoFamilia" => FeatureValue::Categorical(&request.product_family),
            "ProdutoDescricao" => FeatureValue::Categorical(&request.product_description),
            "ProdutoGrupoSOP" => FeatureValue::Categorical(&request.product_group_sop),
            "Canal" => FeatureValue::Categorical(&request.channel),
            "EmpresaNome" => FeatureValue::Categorical(&request.company_name),
            "ClienteCNPJCPF" => FeatureValue::Categorical(&request.customer_document),
            "nuPrecoGerenciaTotal" => FeatureValue::Numeric(self.reference_price),
            "totalSold" => FeatureValue::Numeric(self.total_sold),
            "TotalQuoted" => FeatureValue::Numeric(self.total_quoted),
            "Desconto" => FeatureValue::Numeric(self.discount_pct),
            _ => return None,
        };
        Some(value)
    }
}

/// Builds one record per candidate, in candidate order.
pub fn assemble<'a>(
    request: &'a QuoteRequest,
    reference: &HistoricalRecord,
    candidates: &CandidateSpace,
) -> Result<Vec<FeatureRecord<'a>>, OptimizationError> {
    let reference_price = decimal_to_f64(request.reference_price)?;

    Ok(candidates
        .iter()
        .map(|candidate| FeatureRecord {
            request,
            reference_price,
            total_sold: reference.total_sold,
            total_quoted: reference.total_quoted,
            discount_pct: candidate.model_value(),
        })
        .collect())
}

fn decimal_to_f64(value: Decimal) -> Result<f64, OptimizationError> {
    value.to_f64().ok_or_else(|| {
        OptimizationError::InvalidRequest(format!(
            "nuPrecoGerenciaTotal {value} cannot be represented as a model input"
        ))
    })
}
