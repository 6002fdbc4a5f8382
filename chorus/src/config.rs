//! Pipeline configuration.
//!
//! Backend rosters and budgets are injected configuration, not module
//! constants, so the pipeline is testable with fake backends.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one synthesis pipeline.
///
/// Timeout budgets are nested ceilings: a single call may not outlast its
/// stage, and no stage may outlast the pipeline. [`Self::validate`]
/// enforces the nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Roster of construction backend ids.
    pub construction_backends: Vec<String>,
    /// Roster of style backend ids.
    pub style_backends: Vec<String>,
    /// The primary selector backend id.
    pub primary_selector: String,
    /// Backup selector ids, tried in order on primary failure.
    #[serde(default)]
    pub backup_selectors: Vec<String>,
    /// Variations requested from each backend per stage.
    pub variations_per_backend: usize,
    /// How many construction candidates the style stage refines.
    pub style_top_n: usize,
    /// Hard deadline for a single backend call.
    pub call_timeout: Duration,
    /// Deadline for each of the construction and style fan-outs.
    pub stage_timeout: Duration,
    /// Deadline for the whole pipeline run.
    pub pipeline_timeout: Duration,
    /// Token budget per backend call.
    pub max_tokens: u32,
    /// Temperature for variation index 0.
    pub base_temperature: f64,
    /// Temperature increment per variation index.
    pub temperature_step: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            construction_backends: Vec::new(),
            style_backends: Vec::new(),
            primary_selector: String::new(),
            backup_selectors: Vec::new(),
            variations_per_backend: 2,
            style_top_n: 3,
            call_timeout: Duration::from_secs(8),
            stage_timeout: Duration::from_secs(12),
            pipeline_timeout: Duration::from_secs(30),
            max_tokens: 1024,
            base_temperature: 0.5,
            temperature_step: 0.15,
        }
    }
}

impl SynthesisConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_selector.is_empty() {
            return Err(ConfigError::MissingSelector);
        }
        if self.variations_per_backend == 0 {
            return Err(ConfigError::ZeroVariations);
        }
        if self.style_top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if self.call_timeout.is_zero()
            || self.stage_timeout.is_zero()
            || self.pipeline_timeout.is_zero()
        {
            return Err(ConfigError::InvalidTimeouts(
                "timeouts must be positive".to_string(),
            ));
        }
        if self.call_timeout > self.stage_timeout {
            return Err(ConfigError::InvalidTimeouts(format!(
                "call timeout {:?} exceeds stage timeout {:?}",
                self.call_timeout, self.stage_timeout
            )));
        }
        if self.stage_timeout > self.pipeline_timeout {
            return Err(ConfigError::InvalidTimeouts(format!(
                "stage timeout {:?} exceeds pipeline timeout {:?}",
                self.stage_timeout, self.pipeline_timeout
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroTokenBudget);
        }
        if !(0.0..=1.0).contains(&self.base_temperature) {
            return Err(ConfigError::TemperatureOutOfRange(self.base_temperature));
        }
        Ok(())
    }

    /// Returns the temperature for a variation index, clamped into [0, 1].
    #[must_use]
    pub fn temperature_for(&self, variation_index: usize) -> f64 {
        let temp = self.temperature_step.mul_add(variation_index as f64, self.base_temperature);
        temp.clamp(0.0, 1.0)
    }

    /// Returns the selector ids in priority order: primary, then backups.
    #[must_use]
    pub fn selectors_in_order(&self) -> Vec<&str> {
        std::iter::once(self.primary_selector.as_str())
            .chain(self.backup_selectors.iter().map(String::as_str))
            .collect()
    }
}
