pub mod candidates;
pub mod features;
pub mod predictor;
pub mod pricing;
pub mod selection;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::domain::history::HistoricalRecord;
use crate::domain::quote::QuoteRequest;
use crate::domain::selection::SelectionResult;
use crate::errors::OptimizationError;
use crate::history::HistoryDataset;

use self::{
    candidates::CandidateSpace,
    predictor::{DualPredictor, Regressor},
    selection::ScoredCandidate,
};

/// Scored search space for one request, before selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Evaluation {
    pub reference: HistoricalRecord,
    pub acceptance_fraction: f64,
    pub threshold: f64,
    pub reference_price: Decimal,
    pub scored: Vec<ScoredCandidate>,
}

impl Evaluation {
    pub fn accepted_count(&self) -> usize {
        selection::accepted(&self.scored, self.threshold).count()
    }

    pub fn select(&self) -> Result<SelectionResult, OptimizationError> {
        let selected = selection::select(&self.scored, self.threshold)?;
        let recommended_prices =
            pricing::recommended_prices(self.reference_price, &selected.discounts)?;

        Ok(SelectionResult {
            max_margin: selected.max_margin,
            conversion_rate: selected.conversion_rate,
            discounts: selected.discounts,
            original_price: self.reference_price,
            recommended_prices,
        })
    }
}

/// The discount search: history lookup, feature assembly, scoring, selection, pricing.
///
/// Holds only immutable state, so one instance can serve concurrent requests behind an `Arc`.
pub struct DiscountOptimizer<C, M> {
    candidates: CandidateSpace,
    predictor: DualPredictor<C, M>,
}

impl<C, M> DiscountOptimizer<C, M> {
    pub fn new(candidates: CandidateSpace, conversion_model: C, margin_model: M) -> Self {
        Self { candidates, predictor: DualPredictor::new(conversion_model, margin_model) }
    }

    pub fn candidates(&self) -> &CandidateSpace {
        &self.candidates
    }

    pub fn predictor(&self) -> &DualPredictor<C, M> {
        &self.predictor
    }
}

impl<C: Regressor, M: Regressor> DiscountOptimizer<C, M> {
    pub fn evaluate(
        &self,
        request: &QuoteRequest,
        history: &HistoryDataset,
    ) -> Result<Evaluation, OptimizationError> {
        request.validate()?;
        let reference = history.latest_for(&request.product_description)?;
        let batch = features::assemble(request, reference, &self.candidates)?;
        let predictions = self.predictor.predict(&batch)?;

        let scored = self
            .candidates
            .iter()
            .zip(predictions.conversion_rates)
            .zip(predictions.margins)
            .map(|((candidate, conversion_rate), margin)| ScoredCandidate {
                discount_pct: candidate.discount_pct(),
                conversion_rate,
                margin,
            })
            .collect();

        let threshold = selection::acceptance_threshold(reference, request.acceptance_fraction);
        debug!(
            event_name = "optimizer.evaluate.scored",
            product = %reference.product_description,
            candidates = self.candidates.len(),
            threshold,
            "scored discount candidates"
        );

        Ok(Evaluation {
            reference: reference.clone(),
            acceptance_fraction: request.acceptance_fraction,
            threshold,
            reference_price: request.reference_price,
            scored,
        })
    }

    pub fn optimize(
        &self,
        request: &QuoteRequest,
        history: &HistoryDataset,
    ) -> Result<SelectionResult, OptimizationError> {
        self.evaluate(request, history)?.select()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::DiscountOptimizer;
    use crate::domain::quote::fixtures::quote_request;
    use crate::errors::OptimizationError;
    use crate::history::fixtures::record;
    use crate::history::HistoryDataset;
    use crate::optimizer::candidates::CandidateSpace;
    use crate::optimizer::predictor::fixtures::CurveModel;

    fn default_space() -> CandidateSpace {
        CandidateSpace::new(
            CandidateSpace::DEFAULT_START,
            CandidateSpace::DEFAULT_STOP,
            CandidateSpace::DEFAULT_STEP,
        )
        .expect("default space")
    }

    #[test]
    fn scored_candidates_line_up_with_the_candidate_space() {
        let history = HistoryDataset::from_records(vec![record("TUBO", 10.0, 20.0, 50.0)]);
        let optimizer = DiscountOptimizer::new(
            default_space(),
            CurveModel::new("conversion", |d: f64| 30.0 + d),
            CurveModel::new("margin", |d: f64| 20.0 - d),
        );

        let evaluation = optimizer.evaluate(&quote_request("TUBO"), &history).expect("evaluates");

        assert_eq!(evaluation.scored.len(), optimizer.candidates().len());
        for (scored, candidate) in evaluation.scored.iter().zip(optimizer.candidates().iter()) {
            assert_eq!(scored.discount_pct, candidate.discount_pct());
        }
        assert_eq!(evaluation.threshold, 40.0);
    }

    #[test]
    fn optimize_trades_margin_for_conversion_at_the_threshold() {
        let history = HistoryDataset::from_records(vec![record("TUBO", 10.0, 20.0, 50.0)]);
        // conversion reaches 40 from a 10% discount upward; margin falls with the discount
        let optimizer = DiscountOptimizer::new(
            default_space(),
            CurveModel::new("conversion", |d: f64| 30.0 + d),
            CurveModel::new("margin", |d: f64| 20.0 - d),
        );

        let result = optimizer.optimize(&quote_request("TUBO"), &history).expect("feasible");

        assert_eq!(result.discounts, vec![Decimal::new(10, 0)]);
        assert_eq!(result.max_margin, 10.0);
        assert_eq!(result.recommended_prices, vec![Decimal::new(900, 0)]);
        assert_eq!(result.original_price, Decimal::new(1000, 0));
    }

    #[test]
    fn validation_runs_before_any_lookup() {
        let optimizer = DiscountOptimizer::new(
            default_space(),
            CurveModel::new("conversion", |_: f64| 50.0),
            CurveModel::new("margin", |_: f64| 1.0),
        );
        let mut request = quote_request("TUBO");
        request.acceptance_fraction = -0.1;

        assert!(matches!(
            optimizer.optimize(&request, &HistoryDataset::default()),
            Err(OptimizationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_product_is_reported_before_models_run() {
        let conversion = CurveModel::new("conversion", |_: f64| 50.0);
        let optimizer =
            DiscountOptimizer::new(default_space(), conversion, CurveModel::new("margin", |_: f64| 1.0));
        let history = HistoryDataset::from_records(vec![record("CHAPA", 1.0, 1.0, 10.0)]);

        let error = optimizer.optimize(&quote_request("TUBO"), &history).expect_err("not found");

        assert_eq!(error, OptimizationError::NotFound { product: "TUBO".to_string() });
        assert_eq!(
            optimizer.predictor().conversion_model().calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }
}
