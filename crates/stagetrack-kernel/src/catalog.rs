//! Static, ordered definition of the construction stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of stages in every project.
pub const STAGE_COUNT: usize = 6;

/// One construction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "duration_days")]
    pub nominal_duration_days: u32,
}

impl Stage {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, days: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            nominal_duration_days: days,
        }
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must define exactly {STAGE_COUNT} stages (got {0})")]
    WrongStageCount(usize),

    #[error("duplicate stage id: {0}")]
    DuplicateId(String),

    #[error("stage id must not be empty (ordinal {0})")]
    EmptyId(usize),

    #[error("stage {0} must have a positive duration")]
    NonPositiveDuration(String),
}

/// Ordered stage catalog. Position in the list is the stage ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl StageCatalog {
    /// The six stages every renovation project walks through.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Stage::new("S00", "Material Acceptance", 3),
                Stage::new("S01", "Plumbing & Electrical", 7),
                Stage::new("S02", "Waterproofing & Tiling", 10),
                Stage::new("S03", "Carpentry", 7),
                Stage::new("S04", "Painting", 7),
                Stage::new("S05", "Fixture Installation", 5),
            ],
        }
    }

    /// Build a catalog from explicit stages, in ordinal order.
    pub fn from_stages(stages: Vec<Stage>) -> Result<Self, CatalogError> {
        if stages.len() != STAGE_COUNT {
            return Err(CatalogError::WrongStageCount(stages.len()));
        }

        let mut seen = BTreeSet::new();
        for (ordinal, stage) in stages.iter().enumerate() {
            if stage.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(ordinal));
            }
            if stage.nominal_duration_days == 0 {
                return Err(CatalogError::NonPositiveDuration(stage.id.clone()));
            }
            if !seen.insert(stage.id.as_str()) {
                return Err(CatalogError::DuplicateId(stage.id.clone()));
            }
        }

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in ordinal order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, ordinal: usize) -> Option<&Stage> {
        self.stages.get(ordinal)
    }

    /// Ordinal of `stage_id`, if it belongs to this catalog.
    pub fn ordinal_of(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.id == stage_id)
    }

    /// Sum of nominal durations across every stage.
    pub fn total_nominal_days(&self) -> u64 {
        self.stages
            .iter()
            .map(|stage| u64::from(stage.nominal_duration_days))
            .sum()
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
