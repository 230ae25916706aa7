//! `model_metadata.json` written alongside the trained model.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::{CLASS_COUNT, ClassLabel, DecisionError};

/// Metadata describing the model output layout.
///
/// Only `class_names` is read; other keys in the file are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
}

impl ModelMetadata {
    pub fn load(path: &Path) -> Result<Self, DecisionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DecisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let meta = Self::from_json(&text)?;
        info!(path = %path.display(), "loaded model metadata");
        Ok(meta)
    }

    pub fn from_json(text: &str) -> Result<Self, DecisionError> {
        let meta: Self = serde_json::from_str(text)
            .map_err(|e| DecisionError::config(format!("invalid model metadata: {e}")))?;
        meta.validate()?;
        Ok(meta)
    }

    /// The model's class order must be exactly [`ClassLabel::ALL`].
    ///
    /// Thresholds and scores are matched by position, so any other order
    /// would silently attach thresholds to the wrong disease.
    pub fn validate(&self) -> Result<(), DecisionError> {
        let Some(names) = &self.class_names else {
            return Ok(());
        };
        if names.len() != CLASS_COUNT {
            return Err(DecisionError::config(format!(
                "metadata lists {} classes, expected {CLASS_COUNT}",
                names.len()
            )));
        }
        for (i, (name, label)) in names.iter().zip(ClassLabel::ALL).enumerate() {
            let parsed: ClassLabel = name.parse().map_err(DecisionError::Config)?;
            if parsed != label {
                return Err(DecisionError::config(format!(
                    "metadata class {i} is {name:?}, expected {:?}",
                    label.as_str()
                )));
            }
        }
        Ok(())
    }
}
