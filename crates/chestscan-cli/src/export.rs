//! Parquet export of verdicts for downstream analysis.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chestscan_core::{VerdictSet, verdict_batch, verdict_schema};
use parquet::arrow::ArrowWriter;
use tracing::info;

/// Schema of the exported file: the image path, then the verdict columns.
pub fn export_schema() -> Schema {
    let mut fields = vec![Field::new("image", DataType::Utf8, false)];
    fields.extend(verdict_schema().fields().iter().map(|f| f.as_ref().clone()));
    Schema::new(fields)
}

/// Write one row group per image, one row per class.
pub fn write_parquet(path: &Path, results: &[(String, VerdictSet)]) -> anyhow::Result<()> {
    let schema = Arc::new(export_schema());
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;

    for (image, verdicts) in results {
        let verdict_columns = verdict_batch(verdicts)?;
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        columns.push(Arc::new(StringArray::from(vec![
            image.as_str();
            verdict_columns.num_rows()
        ])));
        columns.extend(verdict_columns.columns().iter().cloned());

        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        writer.write(&batch)?;
        writer.flush()?;
    }

    writer.close()?;
    info!(images = results.len(), path = %path.display(), "exported verdicts");
    Ok(())
}
