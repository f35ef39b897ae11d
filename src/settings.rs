use crate::archive::Archives;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_ERROR_REPORT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlySupport {
    /// Use the RAR decoder when this build has one.
    #[default]
    Auto,
    /// Treat every `.cbr` as unsupported.
    Off,
}

impl FromStr for ReadOnlySupport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ReadOnlySupport::Auto),
            "off" => Ok(ReadOnlySupport::Off),
            other => Err(ConfigError::UnknownReadOnlySupport(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Archives processed at once. `1` keeps the batch sequential.
    pub workers: usize,
    /// Failure lines shown in a batch summary.
    pub error_report_limit: usize,
    pub read_only_support: ReadOnlySupport,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 1,
            error_report_limit: DEFAULT_ERROR_REPORT_LIMIT,
            read_only_support: ReadOnlySupport::Auto,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings =
            serde_yaml::from_str(text).context("failed to parse settings document")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn archives(&self) -> Archives {
        match self.read_only_support {
            ReadOnlySupport::Auto => Archives::with_default_backends(),
            ReadOnlySupport::Off => Archives::writable_only(),
        }
    }
}
