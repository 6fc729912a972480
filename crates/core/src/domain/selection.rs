use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a discount search, serialized with the keys the quoting front end reads.
///
/// `discounts[i]` is the discount that produced `recommended_prices[i]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    #[serde(rename = "Margem Máxima encontrada")]
    pub max_margin: f64,
    #[serde(rename = "Conversion Rate encontrado")]
    pub conversion_rate: f64,
    #[serde(rename = "Desconto(s) encontrado(s)")]
    pub discounts: Vec<Decimal>,
    #[serde(rename = "Preço original")]
    pub original_price: Decimal,
    #[serde(rename = "Preço(s) encontrado(s)")]
    pub recommended_prices: Vec<Decimal>,
}
