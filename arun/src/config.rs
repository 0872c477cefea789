use std::path::Path;

use anyhow::{Context, Result};
use arun_core::Options;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Logger configuration of the runner.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggerConfig {
    /// Level for the `arun` and `arun_core` crates.
    pub app_level_filter: LevelFilter,
    /// Level for everything else.
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { app_level_filter: LevelFilter::Info, level_filter: LevelFilter::Warn }
    }
}

impl LoggerConfig {
    /// Install `env_logger`. `RUST_LOG` still wins over the configured levels.
    pub fn init(&self) {
        env_logger::Builder::new()
            .filter_level(self.level_filter)
            .filter_module("arun", self.app_level_filter)
            .filter_module("arun_core", self.app_level_filter)
            .parse_env(env_logger::Env::default())
            .format_timestamp(None)
            .init();
    }
}

/// Main configuration of the runner, read from an optional JSON file.
/// Please use [`AppConfigBuilder`] if you want to build it from code.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub options: Options,
    pub logger_config: Option<LoggerConfig>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// `AppConfigBuilder` is a convenience builder to create an `AppConfig` from code.
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.config.options = options;
        self
    }

    pub fn with_logger_config(mut self, logger_config: LoggerConfig) -> Self {
        self.config.logger_config = Some(logger_config);
        self
    }

    /// Retrieves the configuration built
    pub fn get(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{ "options": { "regression": true } }"#).unwrap();
        assert!(config.options.regression);
        assert!(!config.options.ignore_errors);
        assert!(config.logger_config.is_none());

        let config: AppConfig = serde_json::from_str(
            r#"{ "logger_config": { "app_level_filter": "Trace", "level_filter": "Off" } }"#,
        )
        .unwrap();
        let logger = config.logger_config.unwrap();
        assert_eq!(logger.app_level_filter, LevelFilter::Trace);
        assert_eq!(logger.level_filter, LevelFilter::Off);
    }
}
