//! Multi-label decision engine.
//!
//! Turns one probability vector into one [`VerdictSet`]: each class is
//! calibrated and compared against its own threshold independently. A score
//! equal to its threshold is positive.

use std::cmp::Ordering;

use serde::Serialize;

use crate::{ClassLabel, DecisionError, ThresholdStore};

/// Verdict for a single class of a single image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VerdictRecord {
    pub label: ClassLabel,
    pub raw_score: f32,
    pub calibrated_score: f32,
    pub threshold: f32,
    pub is_positive: bool,
    /// `calibrated_score - threshold`.
    pub margin: f32,
}

impl VerdictRecord {
    pub fn status(&self) -> &'static str {
        if self.is_positive { "YES" } else { "NO" }
    }
}

/// All per-class verdicts for one image, in class order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictSet {
    records: Vec<VerdictRecord>,
}

impl VerdictSet {
    pub fn records(&self) -> &[VerdictRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, label: ClassLabel) -> Option<&VerdictRecord> {
        self.records.get(label.index())
    }

    pub fn positive_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_positive).count()
    }

    /// Records by descending calibrated score; ties keep class order.
    ///
    /// Does not modify the set, so it can be called any number of times.
    pub fn ranked(&self) -> impl Iterator<Item = &VerdictRecord> + '_ {
        self.sorted_by(|a, b| b.calibrated_score.total_cmp(&a.calibrated_score))
    }

    /// Records by descending margin over threshold; ties keep class order.
    pub fn ranked_by_margin(&self) -> impl Iterator<Item = &VerdictRecord> + '_ {
        self.sorted_by(|a, b| b.margin.total_cmp(&a.margin))
    }

    /// Positive records, most confident first.
    pub fn positives(&self) -> impl Iterator<Item = &VerdictRecord> + '_ {
        self.ranked().filter(|r| r.is_positive)
    }

    fn sorted_by<F>(&self, cmp: F) -> impl Iterator<Item = &VerdictRecord> + '_
    where
        F: Fn(&VerdictRecord, &VerdictRecord) -> Ordering,
    {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        // `sort_by` is stable, so equal keys stay in class order.
        order.sort_by(|&a, &b| cmp(&self.records[a], &self.records[b]));
        order.into_iter().map(move |i| &self.records[i])
    }
}

/// Evaluate one probability vector against the stored thresholds.
///
/// Fails with [`DecisionError::ShapeMismatch`] if the vector length differs
/// from the store's class count, and [`DecisionError::ScoreOutOfRange`] if any
/// value is NaN or outside [0, 1]. All-negative and all-positive results are
/// both ordinary outcomes.
pub fn evaluate(
    probabilities: &[f32],
    store: &ThresholdStore,
) -> Result<VerdictSet, DecisionError> {
    if probabilities.len() != store.class_count() {
        return Err(DecisionError::ShapeMismatch {
            expected: store.class_count(),
            actual: probabilities.len(),
        });
    }
    if let Some((index, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(DecisionError::ScoreOutOfRange { index, value });
    }

    let records = ClassLabel::ALL
        .iter()
        .zip(probabilities)
        .map(|(&label, &raw_score)| -> Result<VerdictRecord, DecisionError> {
            let index = label.index();
            let threshold = store.threshold_for(index)?;
            let calibrated_score = store.calibrate(index, raw_score);
            Ok(VerdictRecord {
                label,
                raw_score,
                calibrated_score,
                threshold,
                is_positive: calibrated_score >= threshold,
                margin: calibrated_score - threshold,
            })
        })
        .collect::<Result<Vec<_>, DecisionError>>()?;

    Ok(VerdictSet { records })
}

/// Ranked view of a verdict set; see [`VerdictSet::ranked`].
pub fn rank(verdicts: &VerdictSet) -> impl Iterator<Item = &VerdictRecord> + '_ {
    verdicts.ranked()
}

pub fn positive_count(verdicts: &VerdictSet) -> usize {
    verdicts.positive_count()
}
