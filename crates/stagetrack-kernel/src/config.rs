//! Engine configuration: stage catalog and reminder lead time.

use crate::catalog::{CatalogError, Stage, StageCatalog};
use crate::reminder::ReminderLeadDays;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    reminder_lead_days: ReminderLeadDays,
    #[serde(default)]
    stages: Option<Vec<Stage>>,
}

/// Validated engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub catalog: StageCatalog,
    pub reminder_lead_days: ReminderLeadDays,
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys fall back to the defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Self::parse(input, "<inline>")
    }

    /// Load from `path`; an absent file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let input = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&input, &path.display().to_string())
    }

    fn parse(input: &str, path: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(input).map_err(|source| ConfigError::ParseToml {
            path: path.to_string(),
            source,
        })?;
        let catalog = match raw.stages {
            Some(stages) => StageCatalog::from_stages(stages)?,
            None => StageCatalog::standard(),
        };
        Ok(Self {
            catalog,
            reminder_lead_days: raw.reminder_lead_days,
        })
    }
}
