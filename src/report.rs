use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{fs, fs::File, path::Path};
use tracing::info;

use crate::aggregate::RegionalResults;

/// Text table of the per-region results, one line per region.
pub fn format_results(results: &RegionalResults) -> Result<String> {
    let batch = results.to_record_batch()?;
    let table = pretty_format_batches(&[batch]).context("formatting regional results")?;
    Ok(table.to_string())
}

/// Write the per-region results as a single-row-group Parquet file.
#[tracing::instrument(level = "info", skip(results, path), fields(path = %path.as_ref().display()))]
pub fn write_results_parquet<P: AsRef<Path>>(results: &RegionalResults, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }

    let batch = results.to_record_batch()?;
    let file = File::create(path).with_context(|| format!("creating results file {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for results")?;
    writer.write(&batch).context("writing results batch")?;
    writer.close().context("closing results writer")?;

    info!(regions = batch.num_rows(), "wrote regional results");
    Ok(())
}
