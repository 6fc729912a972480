use std::sync::Arc;

use aimana_core::config::{AppConfig, ConfigError};
use aimana_core::{
    DiscountOptimizer, HistoryDataset, HistoryError, ModelLoadError, PredictionError,
    RegressionModel,
};
use thiserror::Error;
use tracing::info;

pub type Optimizer = DiscountOptimizer<RegressionModel, RegressionModel>;

/// Read-only state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub optimizer: Arc<Optimizer>,
    pub history: Arc<HistoryDataset>,
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("history dataset load failed: {0}")]
    History(#[from] HistoryError),
    #[error("model load failed: {0}")]
    Model(#[from] ModelLoadError),
    #[error("model `{model}` does not accept the assembled features: {source}")]
    Schema { model: String, source: PredictionError },
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let candidates = config.candidate_space()?;

    let history = HistoryDataset::load(&config.data.history_path)?;
    info!(
        event_name = "system.bootstrap.history_loaded",
        correlation_id = "bootstrap",
        path = %config.data.history_path.display(),
        rows = history.len(),
        products = history.product_count(),
        "history dataset loaded"
    );

    let conversion = load_model(&config.models.conversion_path)?;
    let margin = load_model(&config.models.margin_path)?;

    Ok(Application {
        state: AppState {
            optimizer: Arc::new(DiscountOptimizer::new(candidates, conversion, margin)),
            history: Arc::new(history),
        },
        config,
    })
}

fn load_model(path: &std::path::Path) -> Result<RegressionModel, BootstrapError> {
    let model = RegressionModel::load(path)?;
    model
        .check_schema()
        .map_err(|source| BootstrapError::Schema { model: model.name.clone(), source })?;

    info!(
        event_name = "system.bootstrap.model_loaded",
        correlation_id = "bootstrap",
        model = %model.name,
        version = %model.version,
        path = %path.display(),
        "regression model loaded"
    );
    Ok(model)
}
