use std::fs;
use std::path::Path;

use aimana_core::config::LoadOptions;
use aimana_core::{Evaluation, QuoteRequest, SelectionResult};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::commands::{
    load_config, load_history, load_optimizer, CommandResult, EXIT_DATA, EXIT_OPTIMIZATION,
};

const COMMAND: &str = "predict";

#[derive(Debug, Serialize)]
struct TracedPrediction<'a> {
    evaluation: &'a Evaluation,
    accepted: usize,
    result: &'a SelectionResult,
}

pub fn run(options: &LoadOptions, request_path: &Path, trace: bool) -> CommandResult {
    match execute(options, request_path, trace) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(
    options: &LoadOptions,
    request_path: &Path,
    trace: bool,
) -> Result<CommandResult, CommandResult> {
    let request = read_request(request_path).map_err(|error| {
        CommandResult::failure(COMMAND, "request_input", format!("{error:#}"), EXIT_DATA)
    })?;

    let config = load_config(COMMAND, options)?;
    let history = load_history(COMMAND, &config)?;
    let optimizer = load_optimizer(COMMAND, &config)?;

    let optimization_failure = |error: aimana_core::OptimizationError| {
        CommandResult::failure(COMMAND, error.class(), error.to_string(), EXIT_OPTIMIZATION)
    };

    let evaluation = optimizer.evaluate(&request, &history).map_err(optimization_failure)?;
    let result = evaluation.select().map_err(optimization_failure)?;

    if trace {
        let traced = TracedPrediction {
            evaluation: &evaluation,
            accepted: evaluation.accepted_count(),
            result: &result,
        };
        return Ok(CommandResult::document(COMMAND, &traced));
    }

    Ok(CommandResult::document(COMMAND, &result))
}

fn read_request(path: &Path) -> Result<QuoteRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read request file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("request file `{}` is not a valid quote request", path.display()))
}
