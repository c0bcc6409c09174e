//! Test parameters
//!
//! Loaded from the JSON test-parameter document. Threshold keys are
//! required; the rest have defaults.
//!
//! ```json
//! {
//!   "positionThresholdMin": 0.0,
//!   "positionThresholdMax": 1.0,
//!   "orientationThresholdMin": 0.0,
//!   "orientationThresholdMax": 0.1,
//!   "timestampRequired": false,
//!   "positionAndOrientationRequired": true,
//!   "testTimeout": 30.0,
//!   "wireLayout": { "positionEncoding": "float64be", "bodyEncoding": "float32be" }
//! }
//! ```

use crate::error::ConfigError;
use crate::evaluation::ToleranceConfig;
use crate::spatial::WireLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_test_timeout() -> f64 {
    30.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestParams {
    pub position_threshold_min: f64,
    pub position_threshold_max: f64,
    pub orientation_threshold_min: f64,
    pub orientation_threshold_max: f64,
    pub timestamp_required: bool,
    pub position_and_orientation_required: bool,

    /// Ingestion window in seconds
    #[serde(default = "default_test_timeout")]
    pub test_timeout: f64,

    #[serde(default)]
    pub wire_layout: WireLayout,
}

impl TestParams {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: TestParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parameters with the given tolerances and default layout.
    pub fn with_tolerance(tolerance: ToleranceConfig) -> Self {
        Self {
            position_threshold_min: tolerance.position_min,
            position_threshold_max: tolerance.position_max,
            orientation_threshold_min: tolerance.orientation_min,
            orientation_threshold_max: tolerance.orientation_max,
            timestamp_required: tolerance.timestamp_required,
            position_and_orientation_required: tolerance.require_both,
            test_timeout: default_test_timeout(),
            wire_layout: WireLayout::default(),
        }
    }

    /// Rejects negative thresholds, empty ranges and timeouts that do not
    /// fit a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("positionThresholdMin", self.position_threshold_min),
            ("positionThresholdMax", self.position_threshold_max),
            ("orientationThresholdMin", self.orientation_threshold_min),
            ("orientationThresholdMax", self.orientation_threshold_max),
            ("testTimeout", self.test_timeout),
        ];
        for (name, value) in checks {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if self.position_threshold_min > self.position_threshold_max {
            return Err(ConfigError::InvalidRange {
                name: "positionThreshold",
                min: self.position_threshold_min,
                max: self.position_threshold_max,
            });
        }
        if self.orientation_threshold_min > self.orientation_threshold_max {
            return Err(ConfigError::InvalidRange {
                name: "orientationThreshold",
                min: self.orientation_threshold_min,
                max: self.orientation_threshold_max,
            });
        }
        if Duration::try_from_secs_f64(self.test_timeout).is_err() {
            return Err(ConfigError::TimeoutOutOfRange(self.test_timeout));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> ToleranceConfig {
        ToleranceConfig {
            position_min: self.position_threshold_min,
            position_max: self.position_threshold_max,
            orientation_min: self.orientation_threshold_min,
            orientation_max: self.orientation_threshold_max,
            require_both: self.position_and_orientation_required,
            timestamp_required: self.timestamp_required,
        }
    }

    /// Saturates when the timeout was set past `Duration::MAX` without
    /// going through `validate`.
    pub fn ingestion_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.test_timeout).unwrap_or(Duration::MAX)
    }
}
