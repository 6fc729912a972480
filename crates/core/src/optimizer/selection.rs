use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::history::HistoricalRecord;
use crate::errors::OptimizationError;

/// A candidate discount together with what both models predict for it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub discount_pct: Decimal,
    pub conversion_rate: f64,
    pub margin: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub max_margin: f64,
    /// Conversion rate of the first tied discount, in candidate order.
    pub conversion_rate: f64,
    /// Every accepted discount whose margin equals `max_margin`, in candidate order.
    pub discounts: Vec<Decimal>,
}

/// Minimum predicted conversion rate a candidate must reach.
pub fn acceptance_threshold(reference: &HistoricalRecord, acceptance_fraction: f64) -> f64 {
    reference.conversion_rate_pct * acceptance_fraction
}

pub fn accepted(
    scored: &[ScoredCandidate],
    threshold: f64,
) -> impl Iterator<Item = &ScoredCandidate> + '_ {
    scored.iter().filter(move |candidate| candidate.conversion_rate >= threshold)
}

/// Max-margin selection over the accepted candidates.
///
/// Ties are detected with exact `==` on the predicted margins, so discounts whose margins
/// differ only by floating-point noise are not reported together.
pub fn select(scored: &[ScoredCandidate], threshold: f64) -> Result<Selection, OptimizationError> {
    let mut best: Option<Selection> = None;

    for candidate in accepted(scored, threshold) {
        match best.as_mut() {
            Some(selection) if candidate.margin == selection.max_margin => {
                selection.discounts.push(candidate.discount_pct);
            }
            Some(selection) if candidate.margin < selection.max_margin => {}
            _ => {
                best = Some(Selection {
                    max_margin: candidate.margin,
                    conversion_rate: candidate.conversion_rate,
                    discounts: vec![candidate.discount_pct],
                });
            }
        }
    }

    best.ok_or_else(|| OptimizationError::NoFeasibleCandidate {
        threshold,
        best_conversion_rate: scored.iter().map(|c| c.conversion_rate).reduce(f64::max),
    })
}
