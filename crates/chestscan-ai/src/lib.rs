//! Inference collaborators: image preprocessing and ONNX Runtime classification.

mod model;
mod preprocess;

pub use model::{ScoreModel, analyze, analyze_image, ensure_compatible};
pub use preprocess::{INPUT_SIZE, ImageTensor, preprocess, preprocess_bytes};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::{InputLayout, OnnxModel};
