//! The fixed set of disease classes predicted by the chest X-ray model.
//!
//! Order matters: the model emits one probability per class in exactly this
//! order, and thresholds are stored positionally in the same order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of disease classes in the model output vector.
pub const CLASS_COUNT: usize = 14;

/// One of the 14 thoracic disease labels, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLabel {
    Atelectasis,
    Consolidation,
    Infiltration,
    Pneumothorax,
    Edema,
    Emphysema,
    Fibrosis,
    Effusion,
    Pneumonia,
    #[serde(rename = "Pleural_Thickening")]
    PleuralThickening,
    Cardiomegaly,
    Nodule,
    Mass,
    Hernia,
}

impl ClassLabel {
    /// All labels in model output order.
    pub const ALL: [ClassLabel; CLASS_COUNT] = [
        Self::Atelectasis,
        Self::Consolidation,
        Self::Infiltration,
        Self::Pneumothorax,
        Self::Edema,
        Self::Emphysema,
        Self::Fibrosis,
        Self::Effusion,
        Self::Pneumonia,
        Self::PleuralThickening,
        Self::Cardiomegaly,
        Self::Nodule,
        Self::Mass,
        Self::Hernia,
    ];

    /// Position of this label in the model output vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name as written in `model_metadata.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atelectasis => "Atelectasis",
            Self::Consolidation => "Consolidation",
            Self::Infiltration => "Infiltration",
            Self::Pneumothorax => "Pneumothorax",
            Self::Edema => "Edema",
            Self::Emphysema => "Emphysema",
            Self::Fibrosis => "Fibrosis",
            Self::Effusion => "Effusion",
            Self::Pneumonia => "Pneumonia",
            Self::PleuralThickening => "Pleural_Thickening",
            Self::Cardiomegaly => "Cardiomegaly",
            Self::Nodule => "Nodule",
            Self::Mass => "Mass",
            Self::Hernia => "Hernia",
        }
    }

    /// Human-readable name for tables and reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PleuralThickening => "Pleural Thickening",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = String;

    /// Accepts the metadata spelling or the display spelling, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| {
                label.as_str().eq_ignore_ascii_case(wanted)
                    || label.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown disease class: {s:?}"))
    }
}
