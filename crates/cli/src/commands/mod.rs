pub mod candidates;
pub mod config;
pub mod doctor;
pub mod options;
pub mod predict;

use aimana_core::config::{AppConfig, LoadOptions};
use aimana_core::{DiscountOptimizer, HistoryDataset, RegressionModel};
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATA: u8 = 3;
pub const EXIT_MODEL: u8 = 4;
pub const EXIT_OPTIMIZATION: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Pretty JSON document on success.
    pub fn document(command: &str, document: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(document) {
            Ok(output) => Self { exit_code: EXIT_OK, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_DATA),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) type Optimizer = DiscountOptimizer<RegressionModel, RegressionModel>;

pub(crate) fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })
}

pub(crate) fn load_history(command: &str, config: &AppConfig) -> Result<HistoryDataset, CommandResult> {
    HistoryDataset::load(&config.data.history_path).map_err(|error| {
        CommandResult::failure(command, "history_dataset", error.to_string(), EXIT_DATA)
    })
}

pub(crate) fn load_optimizer(command: &str, config: &AppConfig) -> Result<Optimizer, CommandResult> {
    let candidates = config.candidate_space().map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })?;
    let conversion = load_model(command, &config.models.conversion_path)?;
    let margin = load_model(command, &config.models.margin_path)?;
    Ok(DiscountOptimizer::new(candidates, conversion, margin))
}

fn load_model(command: &str, path: &std::path::Path) -> Result<RegressionModel, CommandResult> {
    let model = RegressionModel::load(path).map_err(|error| {
        CommandResult::failure(command, "model_load", error.to_string(), EXIT_MODEL)
    })?;
    model.check_schema().map_err(|error| {
        CommandResult::failure(
            command,
            "feature_mismatch",
            format!("model `{}`: {error}", model.name),
            EXIT_MODEL,
        )
    })?;
    Ok(model)
}
