//! ONNX Runtime backend for the DenseNet121 chest X-ray classifier.
//!
//! The model directory must contain `model.onnx`, exported from the trained
//! Keras model with a sigmoid head (14 probabilities per image).

use std::path::Path;

use chestscan_core::CLASS_COUNT;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::{ImageTensor, ScoreModel};

/// Memory layout the model input expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, H, W, 3]` (Keras / tf2onnx exports).
    Nhwc,
    /// `[1, 3, H, W]`.
    Nchw,
}

/// Chest X-ray classifier running on ONNX Runtime.
pub struct OnnxModel {
    session: Session,
    layout: InputLayout,
    classes: usize,
}

impl OnnxModel {
    /// Load `model.onnx` from `model_dir`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let layout = tensor_dims(session.inputs()[0].dtype())
            .and_then(infer_layout)
            .unwrap_or(InputLayout::Nhwc);
        let classes = tensor_dims(session.outputs()[0].dtype())
            .and_then(infer_classes)
            .unwrap_or(CLASS_COUNT);
        anyhow::ensure!(
            classes == CLASS_COUNT,
            "model emits {classes} scores per image, expected {CLASS_COUNT}"
        );

        info!(?layout, classes, model = %model_path.display(), "loaded classifier model");
        Ok(Self {
            session,
            layout,
            classes,
        })
    }
}

impl ScoreModel for OnnxModel {
    fn class_count(&self) -> usize {
        self.classes
    }

    fn predict(&mut self, image: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        let (shape, data) = match self.layout {
            InputLayout::Nhwc => (image.nhwc_shape(), image.hwc().to_vec()),
            InputLayout::Nchw => (image.nchw_shape(), image.to_nchw()),
        };
        let input = Tensor::from_array((shape, data.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![input])?;

        // Expect [1, classes].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            output_data.len() == self.classes,
            "unexpected output shape: {dims:?}, expected [1, {}]",
            self.classes
        );

        Ok(output_data.to_vec())
    }
}

/// Dimensions of a tensor-typed input or output.
fn tensor_dims(value_type: &ort::value::ValueType) -> Option<&[i64]> {
    match value_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            let dims: &[i64] = shape;
            Some(dims)
        }
        _ => None,
    }
}

/// Channel position from a 4-D input shape; `None` if it cannot be told.
fn infer_layout(dims: &[i64]) -> Option<InputLayout> {
    match dims {
        [_, 3, _, _] => Some(InputLayout::Nchw),
        [_, _, _, 3] => Some(InputLayout::Nhwc),
        _ => None,
    }
}

/// Number of classes from the output shape's last dimension.
fn infer_classes(dims: &[i64]) -> Option<usize> {
    dims.last()
        .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
}
