use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimizer::candidates::{CandidateSpace, CandidateSpaceError};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["aimana.toml", "config/aimana.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub models: ModelsConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataConfig {
    pub history_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelsConfig {
    pub conversion_path: PathBuf,
    pub margin_path: PathBuf,
}

/// Discount grid in percentage points; `stop` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    pub discount_start: Decimal,
    pub discount_stop: Decimal,
    pub discount_step: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub history_path: Option<PathBuf>,
    pub conversion_model_path: Option<PathBuf>,
    pub margin_model_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            data: DataConfig { history_path: PathBuf::from("data/history.csv") },
            models: ModelsConfig {
                conversion_path: PathBuf::from("models/conversion.json"),
                margin_path: PathBuf::from("models/margin.json"),
            },
            search: SearchConfig {
                discount_start: CandidateSpace::DEFAULT_START,
                discount_stop: CandidateSpace::DEFAULT_STOP,
                discount_step: CandidateSpace::DEFAULT_STEP,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SearchConfig {
    pub fn candidate_space(&self) -> Result<CandidateSpace, CandidateSpaceError> {
        CandidateSpace::new(self.discount_start, self.discount_stop, self.discount_step)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn candidate_space(&self) -> Result<CandidateSpace, ConfigError> {
        self.search
            .candidate_space()
            .map_err(|error| ConfigError::Validation(format!("search: {error}")))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(data) = patch.data {
            if let Some(history_path) = data.history_path {
                self.data.history_path = history_path;
            }
        }

        if let Some(models) = patch.models {
            if let Some(conversion_path) = models.conversion_path {
                self.models.conversion_path = conversion_path;
            }
            if let Some(margin_path) = models.margin_path {
                self.models.margin_path = margin_path;
            }
        }

        if let Some(search) = patch.search {
            if let Some(start) = search.discount_start {
                self.search.discount_start = start;
            }
            if let Some(stop) = search.discount_stop {
                self.search.discount_stop = stop;
            }
            if let Some(step) = search.discount_step {
                self.search.discount_step = step;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AIMANA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AIMANA_SERVER_PORT") {
            self.server.port = parse_env("AIMANA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("AIMANA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("AIMANA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("AIMANA_DATA_HISTORY_PATH") {
            self.data.history_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("AIMANA_MODELS_CONVERSION_PATH") {
            self.models.conversion_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("AIMANA_MODELS_MARGIN_PATH") {
            self.models.margin_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("AIMANA_SEARCH_DISCOUNT_START") {
            self.search.discount_start = parse_env("AIMANA_SEARCH_DISCOUNT_START", &value)?;
        }
        if let Some(value) = read_env("AIMANA_SEARCH_DISCOUNT_STOP") {
            self.search.discount_stop = parse_env("AIMANA_SEARCH_DISCOUNT_STOP", &value)?;
        }
        if let Some(value) = read_env("AIMANA_SEARCH_DISCOUNT_STEP") {
            self.search.discount_step = parse_env("AIMANA_SEARCH_DISCOUNT_STEP", &value)?;
        }

        let log_level = read_env("AIMANA_LOGGING_LEVEL").or_else(|| read_env("AIMANA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AIMANA_LOGGING_FORMAT").or_else(|| read_env("AIMANA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(history_path) = overrides.history_path {
            self.data.history_path = history_path;
        }
        if let Some(conversion_path) = overrides.conversion_model_path {
            self.models.conversion_path = conversion_path;
        }
        if let Some(margin_path) = overrides.margin_model_path {
            self.models.margin_path = margin_path;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_paths(&self.data, &self.models)?;
        validate_search(&self.search)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The explicit path when it exists, otherwise the first default location present.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_paths(data: &DataConfig, models: &ModelsConfig) -> Result<(), ConfigError> {
    let paths = [
        ("data.history_path", &data.history_path),
        ("models.conversion_path", &models.conversion_path),
        ("models.margin_path", &models.margin_path),
    ];
    for (key, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    search.candidate_space().map(|_| ()).map_err(|error| {
        ConfigError::Validation(format!(
            "search range [{}, {}) step {} is unusable: {error}",
            search.discount_start, search.discount_stop, search.discount_step
        ))
    })
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    data: Option<DataPatch>,
    models: Option<ModelsPatch>,
    search: Option<SearchPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    history_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelsPatch {
    conversion_path: Option<PathBuf>,
    margin_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    discount_start: Option<Decimal>,
    discount_stop: Option<Decimal>,
    discount_step: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
