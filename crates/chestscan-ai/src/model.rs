//! The inference seam between preprocessing and the decision engine.

use anyhow::Context;
use chestscan_core::{ThresholdStore, VerdictSet, evaluate};
use image::DynamicImage;
use tracing::debug;

use crate::{ImageTensor, preprocess, preprocess_bytes};

/// A model that turns one preprocessed image into per-class probabilities.
///
/// Implementations return exactly `class_count()` values in class order.
pub trait ScoreModel {
    fn class_count(&self) -> usize;

    fn predict(&mut self, image: &ImageTensor) -> anyhow::Result<Vec<f32>>;
}

/// Check that `model` emits one score per class the store holds a threshold for.
pub fn ensure_compatible<M: ScoreModel + ?Sized>(
    model: &M,
    store: &ThresholdStore,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        model.class_count() == store.class_count(),
        "model emits {} scores per image but {} thresholds are loaded",
        model.class_count(),
        store.class_count()
    );
    Ok(())
}

/// Decode, preprocess, score, and evaluate one encoded image.
pub fn analyze<M: ScoreModel + ?Sized>(
    model: &mut M,
    store: &ThresholdStore,
    image_bytes: &[u8],
) -> anyhow::Result<VerdictSet> {
    let tensor = preprocess_bytes(image_bytes)?;
    score_and_evaluate(model, store, &tensor)
}

/// Same as [`analyze`] for an already-decoded image.
pub fn analyze_image<M: ScoreModel + ?Sized>(
    model: &mut M,
    store: &ThresholdStore,
    image: &DynamicImage,
) -> anyhow::Result<VerdictSet> {
    let tensor = preprocess(image);
    score_and_evaluate(model, store, &tensor)
}

fn score_and_evaluate<M: ScoreModel + ?Sized>(
    model: &mut M,
    store: &ThresholdStore,
    tensor: &ImageTensor,
) -> anyhow::Result<VerdictSet> {
    let probabilities = model.predict(tensor).context("model inference failed")?;
    debug!(?probabilities, "raw model scores");
    let verdicts = evaluate(&probabilities, store)?;
    debug!(positives = verdicts.positive_count(), "evaluated verdicts");
    Ok(verdicts)
}
