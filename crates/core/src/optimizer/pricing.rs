use rust_decimal::Decimal;

use crate::errors::OptimizationError;

/// `reference_price * (1 - discount_pct / 100)`.
///
/// The same formula covers both signs: a negative discount yields a price above the reference.
pub fn recommended_price(
    reference_price: Decimal,
    discount_pct: Decimal,
) -> Result<Decimal, OptimizationError> {
    let factor = Decimal::ONE - discount_pct / Decimal::ONE_HUNDRED;
    reference_price.checked_mul(factor).ok_or_else(|| {
        OptimizationError::InvalidRequest(format!(
            "price {reference_price} with discount {discount_pct}% overflows"
        ))
    })
}

/// Prices for each discount, index-aligned with `discounts`.
pub fn recommended_prices(
    reference_price: Decimal,
    discounts: &[Decimal],
) -> Result<Vec<Decimal>, OptimizationError> {
    discounts.iter().map(|discount| recommended_price(reference_price, *discount)).collect()
}
