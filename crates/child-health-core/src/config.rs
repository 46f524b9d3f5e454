//! Analysis Configuration
//!
//! Thresholds and score contributions used by the growth analyzer.
//! Defaults reproduce the standard booklet rules; a JSON file may
//! override any subset of fields.

use crate::classify::{BMI_ABOVE_THRESHOLD, BMI_BELOW_THRESHOLD, DEFAULT_TOLERANCE};
use crate::{ChildHealthError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Relative tolerance for weight, height and head circumference
    pub tolerance: f64,
    /// BMI strictly below this is `Below`
    pub bmi_below: f64,
    /// BMI strictly above this is `Above`
    pub bmi_above: f64,
    /// Score contribution of a `Within` verdict
    pub within_score: f64,
    /// Score contribution of an `Above` or `Below` verdict
    pub deviation_score: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            tolerance: DEFAULT_TOLERANCE,
            bmi_below: BMI_BELOW_THRESHOLD,
            bmi_above: BMI_ABOVE_THRESHOLD,
            within_score: 100.0,
            deviation_score: 60.0,
        }
    }
}

impl AnalysisConfig {
    /// Check ranges; contributions must lie in 0..=100 so scores stay in 0..=100
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ChildHealthError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if !self.bmi_below.is_finite() || !self.bmi_above.is_finite() || self.bmi_below > self.bmi_above {
            return Err(ChildHealthError::InvalidConfig(format!(
                "bmi_below ({}) must not exceed bmi_above ({})",
                self.bmi_below, self.bmi_above
            )));
        }
        for (name, value) in [("within_score", self.within_score), ("deviation_score", self.deviation_score)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ChildHealthError::InvalidConfig(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
