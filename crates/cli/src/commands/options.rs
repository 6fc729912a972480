use aimana_core::config::LoadOptions;

use crate::commands::{load_config, load_history, CommandResult};

const COMMAND: &str = "options";

/// Distinct form values from the configured history dataset.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    match load_history(COMMAND, &config) {
        Ok(history) => CommandResult::document(COMMAND, &history.form_options()),
        Err(failure) => failure,
    }
}
