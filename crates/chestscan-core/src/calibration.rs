//! Temperature scaling applied to raw model probabilities before thresholding.
//!
//! `calibrated = sigmoid(logit(raw) / temperature + bias[class])`. The
//! transform is per-element and monotonic in `raw` for each class. A
//! temperature of 1 with no bias is the identity and leaves scores untouched.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{CLASS_COUNT, DecisionError};

/// Calibration loaded from `calibration.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub temperature: f32,
    /// Optional per-class offset added in logit space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<Vec<f32>>,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self::identity()
    }
}

impl CalibrationParameters {
    pub fn identity() -> Self {
        Self {
            temperature: 1.0,
            bias: None,
        }
    }

    /// Temperature-only calibration.
    pub fn with_temperature(temperature: f32) -> Result<Self, DecisionError> {
        let params = Self {
            temperature,
            bias: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Load and validate a calibration record from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DecisionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DecisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params = Self::from_json(&text)?;
        info!(
            temperature = params.temperature,
            bias = params.bias.is_some(),
            path = %path.display(),
            "loaded calibration"
        );
        Ok(params)
    }

    pub fn from_json(text: &str) -> Result<Self, DecisionError> {
        let params: Self = serde_json::from_str(text)
            .map_err(|e| DecisionError::config(format!("invalid calibration JSON: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), DecisionError> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(DecisionError::config(format!(
                "calibration temperature must be positive and finite, got {}",
                self.temperature
            )));
        }
        if let Some(bias) = &self.bias {
            if bias.len() != CLASS_COUNT {
                return Err(DecisionError::config(format!(
                    "calibration bias has {} values, expected {CLASS_COUNT}",
                    bias.len()
                )));
            }
            if let Some((i, b)) = bias.iter().enumerate().find(|(_, b)| !b.is_finite()) {
                return Err(DecisionError::config(format!(
                    "calibration bias at index {i} is not finite: {b}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.temperature == 1.0 && self.bias.is_none()
    }

    /// Calibrate one raw probability for the class at `index`.
    ///
    /// Identity calibration returns `raw` unchanged, bit for bit.
    pub fn apply(&self, index: usize, raw: f32) -> f32 {
        if self.is_identity() {
            return raw;
        }
        let bias = self
            .bias
            .as_ref()
            .and_then(|b| b.get(index))
            .copied()
            .unwrap_or(0.0) as f64;
        let z = logit(raw as f64) / self.temperature as f64 + bias;
        sigmoid(z) as f32
    }
}

/// `ln(p / (1 - p))`; saturates to ±inf at 0 and 1.
fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
