use std::env;
use std::fs;
use std::path::Path;

use aimana_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_OK};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = [
        ("server.bind_address", config.server.bind_address.clone(), "AIMANA_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "AIMANA_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "AIMANA_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        (
            "data.history_path",
            config.data.history_path.display().to_string(),
            "AIMANA_DATA_HISTORY_PATH",
        ),
        (
            "models.conversion_path",
            config.models.conversion_path.display().to_string(),
            "AIMANA_MODELS_CONVERSION_PATH",
        ),
        (
            "models.margin_path",
            config.models.margin_path.display().to_string(),
            "AIMANA_MODELS_MARGIN_PATH",
        ),
        (
            "search.discount_start",
            config.search.discount_start.to_string(),
            "AIMANA_SEARCH_DISCOUNT_START",
        ),
        (
            "search.discount_stop",
            config.search.discount_stop.to_string(),
            "AIMANA_SEARCH_DISCOUNT_STOP",
        ),
        (
            "search.discount_step",
            config.search.discount_step.to_string(),
            "AIMANA_SEARCH_DISCOUNT_STEP",
        ),
        ("logging.level", config.logging.level.clone(), "AIMANA_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "AIMANA_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        lines.push(render_line(key, &value, source(key, env_key)));
    }

    CommandResult { exit_code: EXIT_OK, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
