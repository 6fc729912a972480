use serde::{Deserialize, Serialize};

/// One row of the historical quote dataset.
///
/// Only the description and the three volume/rate columns are required; the remaining columns
/// feed the form options and are optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(rename = "ProdutoDescricao")]
    pub product_description: String,
    #[serde(rename = "totalSold")]
    pub total_sold: f64,
    #[serde(rename = "TotalQuoted")]
    pub total_quoted: f64,
    #[serde(rename = "ConversionRate_%")]
    pub conversion_rate_pct: f64,
    #[serde(rename = "FaixaPeso", default, skip_serializing_if = "Option::is_none")]
    pub weight_band: Option<String>,
    #[serde(rename = "ProdutoFamilia", default, skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    #[serde(rename = "ProdutoGrupoSOP", default, skip_serializing_if = "Option::is_none")]
    pub product_group_sop: Option<String>,
    #[serde(rename = "Canal", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(rename = "EmpresaNome", default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(rename = "ClienteCNPJCPF", default, skip_serializing_if = "Option::is_none")]
    pub customer_document: Option<String>,
}

/// Source data quotes product descriptions inconsistently (`1/2"` vs `1/2'`), so keys are
/// compared with every double quote replaced by a single quote.
pub fn normalize_description(description: &str) -> String {
    description.replace('"', "'")
}
