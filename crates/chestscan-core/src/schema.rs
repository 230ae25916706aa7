//! Arrow schema for per-image verdict tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::VerdictSet;

/// One row per disease class, in class order.
pub fn verdict_schema() -> Schema {
    Schema::new(vec![
        Field::new("disease", DataType::Utf8, false),
        Field::new("raw_score", DataType::Float32, false),
        Field::new("calibrated_score", DataType::Float32, false),
        Field::new("threshold", DataType::Float32, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("margin", DataType::Float32, false),
        // 1-based position in the ranked view.
        Field::new("rank", DataType::UInt32, false),
    ])
}

/// Build a [`RecordBatch`] from a verdict set using [`verdict_schema`].
pub fn verdict_batch(verdicts: &VerdictSet) -> Result<RecordBatch, ArrowError> {
    let records = verdicts.records();

    let mut rank = vec![0u32; records.len()];
    for (pos, rec) in verdicts.ranked().enumerate() {
        rank[rec.label.index()] = pos as u32 + 1;
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.label.display_name()),
        )),
        Arc::new(Float32Array::from_iter_values(records.iter().map(|r| r.raw_score))),
        Arc::new(Float32Array::from_iter_values(
            records.iter().map(|r| r.calibrated_score),
        )),
        Arc::new(Float32Array::from_iter_values(records.iter().map(|r| r.threshold))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.status()))),
        Arc::new(Float32Array::from_iter_values(records.iter().map(|r| r.margin))),
        Arc::new(UInt32Array::from(rank)),
    ];

    RecordBatch::try_new(Arc::new(verdict_schema()), columns)
}
