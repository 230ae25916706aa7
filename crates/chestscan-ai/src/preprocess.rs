//! Image preprocessing for the DenseNet121 chest X-ray model.
//!
//! Any decodable PNG/JPEG (grayscale, RGB, or RGBA) becomes a 224×224 RGB
//! tensor with values scaled to [0, 1]. No mean/std normalisation: the
//! model was trained on plain `pixel / 255` inputs.

use anyhow::Context;
use image::DynamicImage;
use image::imageops::FilterType;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

const CHANNELS: usize = 3;

/// One preprocessed image, stored height × width × channel (NHWC, batch of one).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl ImageTensor {
    /// Wrap an existing HWC buffer with three channels.
    pub fn from_hwc(data: Vec<f32>, height: usize, width: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(
            data.len() == height * width * CHANNELS,
            "buffer has {} values, expected {height}x{width}x{CHANNELS}",
            data.len()
        );
        Ok(Self {
            data,
            height,
            width,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Raw HWC values.
    pub fn hwc(&self) -> &[f32] {
        &self.data
    }

    /// `[1, H, W, 3]`, the Keras layout.
    pub fn nhwc_shape(&self) -> [i64; 4] {
        [1, self.height as i64, self.width as i64, CHANNELS as i64]
    }

    /// `[1, 3, H, W]`, the layout most PyTorch exports expect.
    pub fn nchw_shape(&self) -> [i64; 4] {
        [1, CHANNELS as i64, self.height as i64, self.width as i64]
    }

    /// Copy into channel-planar (CHW) order.
    pub fn to_nchw(&self) -> Vec<f32> {
        let plane = self.height * self.width;
        let mut out = vec![0.0f32; self.data.len()];
        for (i, px) in self.data.chunks_exact(CHANNELS).enumerate() {
            for (c, &v) in px.iter().enumerate() {
                out[c * plane + i] = v;
            }
        }
        out
    }
}

/// Decode PNG/JPEG bytes and preprocess them.
pub fn preprocess_bytes(bytes: &[u8]) -> anyhow::Result<ImageTensor> {
    let img = image::load_from_memory(bytes).context("could not process image")?;
    Ok(preprocess(&img))
}

/// Resize to 224×224 (bilinear), convert to RGB, and scale to [0, 1].
pub fn preprocess(img: &DynamicImage) -> ImageTensor {
    let rgb = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();
    let data = rgb.into_raw().into_iter().map(|v| v as f32 / 255.0).collect();
    ImageTensor {
        data,
        height: INPUT_SIZE as usize,
        width: INPUT_SIZE as usize,
    }
}
