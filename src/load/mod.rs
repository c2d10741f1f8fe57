use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::{fs::File, path::Path};
use tracing::info;

use crate::config::PipelineConfig;

pub mod shapes;
pub mod types;

pub use shapes::load_region_shapes;
pub use types::{Department, ReferendumRow, Region, RegionShape};

/// Read every record of a delimited file with a header row into `T`.
///
/// The file handle lives only for the duration of the call.
fn read_delimited<T, P>(path: P, delimiter: u8) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize::<T>().enumerate() {
        let row: T = result
            .with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Referendum results use `;` as the separator.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_referendum<P: AsRef<Path>>(path: P) -> Result<Vec<ReferendumRow>> {
    let rows: Vec<ReferendumRow> = read_delimited(path, b';')?;
    info!(rows = rows.len(), "loaded referendum");
    Ok(rows)
}

#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_regions<P: AsRef<Path>>(path: P) -> Result<Vec<Region>> {
    let rows: Vec<Region> = read_delimited(path, b',')?;
    info!(rows = rows.len(), "loaded regions");
    Ok(rows)
}

#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_departments<P: AsRef<Path>>(path: P) -> Result<Vec<Department>> {
    let rows: Vec<Department> = read_delimited(path, b',')?;
    info!(rows = rows.len(), "loaded departments");
    Ok(rows)
}

/// Load the three tables as-is: referendum, regions, departments.
pub fn load_data(
    config: &PipelineConfig,
) -> Result<(Vec<ReferendumRow>, Vec<Region>, Vec<Department>)> {
    let referendum = read_referendum(&config.referendum_path)?;
    let regions = read_regions(&config.regions_path)?;
    let departments = read_departments(&config.departments_path)?;
    Ok((referendum, regions, departments))
}
