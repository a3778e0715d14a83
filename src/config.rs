// ⚙️ Pipeline Configuration
// Loaded from JSON; any field left out falls back to the defaults below.

use crate::features::IndicatorRule;
use crate::pivot::NonNumericPolicy;
use crate::report::ReportConfig;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Occupancy classifications kept from the tenancy roster
    pub occupancy_allow: Vec<String>,

    /// Handling of non-numeric quantities in summed attribute pivots
    pub non_numeric: NonNumericPolicy,

    /// Derived indicators, applied in order after the join
    pub indicators: Vec<IndicatorRule>,

    pub report: ReportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            occupancy_allow: vec!["Tenant".to_string(), "Void".to_string()],
            non_numeric: NonNumericPolicy::Error,
            indicators: vec![IndicatorRule::level_access_bathing()],
            report: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config JSON")
    }
}

// ============================================================================
// TESTS
// ============================================================================
