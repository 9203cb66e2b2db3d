// Wizard configuration
//
// Sources, lowest to highest precedence:
// - built-in defaults
// - optional TOML file (`LAUNCHER_SETUP_CONFIG`, else `<config_dir>/launcher-setup/setup.toml`)
// - `LAUNCHER_SETUP_*` environment variables

use crate::models::session::Locale;
use crate::utils::path_resolver;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "LAUNCHER_SETUP";

const MAX_TRANSITION_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardConfig {
    /// How long the exiting step stays on screen during a transition.
    pub transition_ms: u64,
    /// Percentage the bar holds at while import stages run.
    pub progress_watermark: u8,
    pub skip_reason_separator: String,
    /// Case-insensitive fragments that mark a backend error as "wrong password".
    pub wrong_password_markers: Vec<String>,
    pub locale: String,
    pub log_level: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            transition_ms: 280,
            progress_watermark: 99,
            skip_reason_separator: " / ".to_string(),
            wrong_password_markers: vec!["password".to_string(), "decrypt".to_string()],
            locale: "en".to_string(),
            log_level: "debug".to_string(),
        }
    }
}

impl WizardConfig {
    /// Defaults, then the resolved config file if present, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = path_resolver::resolve_config_file();
        Self::load_from(file.as_deref(), true)
    }

    pub fn load_from(file: Option<&Path>, use_env: bool) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("transition_ms", defaults.transition_ms as i64)?
            .set_default("progress_watermark", defaults.progress_watermark as i64)?
            .set_default("skip_reason_separator", defaults.skip_reason_separator)?
            .set_default("wrong_password_markers", defaults.wrong_password_markers)?
            .set_default("locale", defaults.locale)?
            .set_default("log_level", defaults.log_level)?;

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        if use_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("wrong_password_markers"),
            );
        }

        let loaded: WizardConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=99).contains(&self.progress_watermark) {
            return Err(ConfigError::Invalid(format!(
                "progress_watermark must be within 1..=99 (got {})",
                self.progress_watermark
            )));
        }
        if self.skip_reason_separator.is_empty() {
            return Err(ConfigError::Invalid(
                "skip_reason_separator must not be empty".to_string(),
            ));
        }
        if self.transition_ms > MAX_TRANSITION_MS {
            return Err(ConfigError::Invalid(format!(
                "transition_ms must be at most {} (got {})",
                MAX_TRANSITION_MS, self.transition_ms
            )));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' is not a log level",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn locale(&self) -> Locale {
        Locale::from_user_value(&self.locale)
    }

    pub fn watermark(&self) -> f64 {
        f64::from(self.progress_watermark)
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Debug)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
