//! Text views of verdicts and thresholds for the terminal.
//!
//! Tables are built as Arrow batches and rendered with Arrow's pretty printer,
//! so every table in the CLI shares one layout.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chestscan_core::{ClassLabel, ThresholdStore, VerdictSet};

const BAR_WIDTH: usize = 40;

// ── Findings ──

/// Predicted diseases, most confident first.
pub fn findings(verdicts: &VerdictSet) -> String {
    let mut out = String::new();
    if verdicts.positive_count() == 0 {
        out.push_str("No abnormality found\n");
        return out;
    }
    out.push_str("Predicted Diseases:\n");
    for rec in verdicts.positives() {
        out.push_str(&format!("  - {}\n", rec.label.display_name()));
    }
    out
}

// ── Detailed table ──

/// All classes in class order with score, threshold, and status.
///
/// A calibrated-score column is added only when calibration moved a score.
pub fn detailed_table(verdicts: &VerdictSet) -> anyhow::Result<String> {
    let records = verdicts.records();
    let calibrated = records.iter().any(|r| r.calibrated_score != r.raw_score);

    let mut columns: Vec<(&str, Vec<String>)> = vec![
        (
            "Disease",
            records.iter().map(|r| r.label.display_name().to_string()).collect(),
        ),
        (
            "Model Score",
            records.iter().map(|r| format!("{:.4}", r.raw_score)).collect(),
        ),
    ];
    if calibrated {
        columns.push((
            "Calibrated",
            records
                .iter()
                .map(|r| format!("{:.4}", r.calibrated_score))
                .collect(),
        ));
    }
    columns.push((
        "Threshold",
        records.iter().map(|r| format!("{:.4}", r.threshold)).collect(),
    ));
    columns.push((
        "Status",
        records.iter().map(|r| r.status().to_string()).collect(),
    ));

    render_table(columns)
}

// ── Score chart ──

/// Horizontal bars of each score with the threshold marked by `|`.
pub fn score_chart(verdicts: &VerdictSet) -> String {
    let mut out = String::from("Disease Score vs Threshold Comparison\n");
    for rec in verdicts.records() {
        out.push_str(&format!(
            "  {:<20} {} {:.3} / {:.3} {}\n",
            rec.label.display_name(),
            bar(rec.calibrated_score, rec.threshold),
            rec.calibrated_score,
            rec.threshold,
            rec.status()
        ));
    }
    out
}

fn bar(score: f32, threshold: f32) -> String {
    let filled = cells(score);
    // The marker sits in the last cell when the threshold is 1.0.
    let marker = cells(threshold).min(BAR_WIDTH - 1);
    (0..BAR_WIDTH)
        .map(|i| {
            if i == marker {
                '|'
            } else if i < filled {
                '#'
            } else {
                '.'
            }
        })
        .collect()
}

fn cells(value: f32) -> usize {
    ((value.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH)
}

// ── Threshold table ──

/// Loaded thresholds per class, followed by a calibration summary.
pub fn threshold_table(store: &ThresholdStore) -> anyhow::Result<String> {
    let bias = store.calibration().and_then(|c| c.bias.as_deref());

    let mut columns: Vec<(&str, Vec<String>)> = vec![
        (
            "Disease",
            ClassLabel::ALL
                .iter()
                .map(|l| l.display_name().to_string())
                .collect(),
        ),
        (
            "Threshold",
            store.thresholds().iter().map(|t| format!("{t:.4}")).collect(),
        ),
    ];
    if let Some(bias) = bias {
        columns.push(("Bias", bias.iter().map(|b| format!("{b:+.4}")).collect()));
    }

    let mut out = render_table(columns)?;
    out.push('\n');
    match store.calibration() {
        Some(cal) if !cal.is_identity() => {
            out.push_str(&format!("Calibration: temperature {:.4}\n", cal.temperature));
        }
        _ => out.push_str("Calibration: none (raw model scores)\n"),
    }
    Ok(out)
}

// ── Helpers ──

fn render_table(columns: Vec<(&str, Vec<String>)>) -> anyhow::Result<String> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Utf8, false))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|(_, values)| Arc::new(StringArray::from(values)) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}
