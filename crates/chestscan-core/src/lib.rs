pub mod calibration;
pub mod decision;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod npy;
pub mod schema;
pub mod thresholds;

pub use calibration::CalibrationParameters;
pub use decision::{VerdictRecord, VerdictSet, evaluate, positive_count, rank};
pub use error::DecisionError;
pub use labels::{CLASS_COUNT, ClassLabel};
pub use metadata::ModelMetadata;
pub use schema::{verdict_batch, verdict_schema};
pub use thresholds::ThresholdStore;
