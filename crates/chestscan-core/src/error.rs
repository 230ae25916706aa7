use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    /// Malformed or missing threshold, calibration, or metadata artifact.
    #[error("config error: {0}")]
    Config(String),

    #[error("could not read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("probability vector has {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("class index {index} out of range (0..{len})")]
    Index { index: usize, len: usize },

    #[error("score {value} at class index {index} is outside [0, 1]")]
    ScoreOutOfRange { index: usize, value: f32 },
}

impl DecisionError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors raised while loading artifacts, before any evaluation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io { .. })
    }
}
