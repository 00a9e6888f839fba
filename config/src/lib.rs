//! Configuration for exact real arithmetic.
//!
//! The file lives at `$EXACT_CONFIG` or `~/.exact/config.toml`. Every section
//! and key is optional; missing values fall back to the built-in defaults of
//! [`ScheduleParams`] and [`DriverSettings`].

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use exact_types::{DriverSettings, ScheduleError, ScheduleParams};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "EXACT_CONFIG";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExactConfig {
    pub precision: Option<PrecisionConfig>,
    pub driver: Option<DriverConfig>,
}

/// `[precision]`: shape of the precision schedule.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrecisionConfig {
    /// Precision exponent of the first step.
    pub start: Option<i32>,
    /// Basic increment between steps.
    pub increment: Option<i32>,
    /// Growth factor of the increments.
    pub factor: Option<f64>,
    /// Step a driver invocation starts at.
    pub start_step: Option<usize>,
}

/// `[driver]`: retry escalation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    pub prec_skip: Option<u32>,
    pub step_increment: Option<usize>,
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value")]
    Invalid(#[from] ScheduleError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl ExactConfig {
    /// Loads the configuration from the default location.
    ///
    /// A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Schedule parameters with defaults filled in.
    pub fn schedule_params(&self) -> Result<ScheduleParams, ConfigError> {
        let defaults = ScheduleParams::default();
        let precision = self.precision.clone().unwrap_or_default();
        Ok(ScheduleParams::new(
            precision.start.unwrap_or(defaults.start()),
            precision.increment.unwrap_or(defaults.increment()),
            precision.factor.unwrap_or(defaults.factor()),
        )?)
    }

    /// Driver settings with defaults filled in.
    pub fn driver_settings(&self) -> Result<DriverSettings, ConfigError> {
        let defaults = DriverSettings::default();
        let driver = self.driver.clone().unwrap_or_default();
        let start_step = self
            .precision
            .as_ref()
            .and_then(|precision| precision.start_step)
            .unwrap_or(defaults.start_step());
        Ok(DriverSettings::new(
            start_step,
            driver.prec_skip.unwrap_or(defaults.prec_skip()),
            driver.step_increment.unwrap_or(defaults.step_increment()),
            driver.max_iterations.or(defaults.max_iterations()),
        )?)
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV)
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".exact").join("config.toml"))
}
