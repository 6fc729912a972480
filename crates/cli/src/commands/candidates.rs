use aimana_core::config::LoadOptions;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{load_config, CommandResult, EXIT_CONFIG};

const COMMAND: &str = "candidates";

#[derive(Debug, Serialize)]
struct CandidateGrid {
    start: Decimal,
    stop: Decimal,
    step: Decimal,
    count: usize,
    discounts: Vec<Decimal>,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let space = match config.candidate_space() {
        Ok(space) => space,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    CommandResult::document(
        COMMAND,
        &CandidateGrid {
            start: space.start(),
            stop: space.stop(),
            step: space.step(),
            count: space.len(),
            discounts: space.iter().map(|candidate| candidate.discount_pct()).collect(),
        },
    )
}
