use std::sync::Arc;

use thiserror::Error;

use crate::errors::OptimizationError;
use crate::optimizer::features::FeatureRecord;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("{0}")]
    FeatureMismatch(String),
    #[error("{0}")]
    Inference(String),
}

/// A trained regression model, opaque to the optimizer.
pub trait Regressor: Send + Sync {
    fn name(&self) -> &str;

    /// One prediction per input row, in input order.
    fn predict(&self, batch: &[FeatureRecord<'_>]) -> Result<Vec<f64>, PredictionError>;
}

impl<T: Regressor + ?Sized> Regressor for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&self, batch: &[FeatureRecord<'_>]) -> Result<Vec<f64>, PredictionError> {
        (**self).predict(batch)
    }
}

impl<T: Regressor + ?Sized> Regressor for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&self, batch: &[FeatureRecord<'_>]) -> Result<Vec<f64>, PredictionError> {
        (**self).predict(batch)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predictions {
    pub conversion_rates: Vec<f64>,
    pub margins: Vec<f64>,
}

/// Runs the conversion-rate and margin models over the same batch, once each.
pub struct DualPredictor<C, M> {
    conversion_model: C,
    margin_model: M,
}

impl<C, M> DualPredictor<C, M> {
    pub fn new(conversion_model: C, margin_model: M) -> Self {
        Self { conversion_model, margin_model }
    }

    pub fn conversion_model(&self) -> &C {
        &self.conversion_model
    }

    pub fn margin_model(&self) -> &M {
        &self.margin_model
    }
}

impl<C: Regressor, M: Regressor> DualPredictor<C, M> {
    pub fn predict(&self, batch: &[FeatureRecord<'_>]) -> Result<Predictions, OptimizationError> {
        let conversion_rates = run_model(&self.conversion_model, batch)?;
        let margins = run_model(&self.margin_model, batch)?;
        Ok(Predictions { conversion_rates, margins })
    }
}

fn run_model<R: Regressor + ?Sized>(
    model: &R,
    batch: &[FeatureRecord<'_>],
) -> Result<Vec<f64>, OptimizationError> {
    let predictions = model.predict(batch).map_err(|error| match error {
        PredictionError::FeatureMismatch(detail) => {
            OptimizationError::FeatureMismatch { model: model.name().to_string(), detail }
        }
        PredictionError::Inference(detail) => {
            OptimizationError::ModelInference { model: model.name().to_string(), detail }
        }
    })?;

    if predictions.len() != batch.len() {
        return Err(OptimizationError::ModelInference {
            model: model.name().to_string(),
            detail: format!("returned {} predictions for {} rows", predictions.len(), batch.len()),
        });
    }

    if let Some(row) = predictions.iter().position(|value| !value.is_finite()) {
        return Err(OptimizationError::ModelInference {
            model: model.name().to_string(),
            detail: format!("returned a non-finite prediction for row {row}"),
        });
    }

    Ok(predictions)
}
