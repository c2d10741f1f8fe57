use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, warn};

use super::{codes::normalize_code, select_columns, ROW_INDEX};
use crate::load::{Department, Region};

/// Column layout of the area lookup.
pub const AREA_COLUMNS: [&str; 4] = ["code_reg", "name_reg", "code_dep", "name_dep"];

fn regions_frame(regions: &[Region]) -> PolarsResult<DataFrame> {
    df!(
        "code_reg" => regions.iter().map(|r| normalize_code(&r.code)).collect::<Vec<_>>(),
        "name_reg" => regions.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
    )
}

fn departments_frame(departments: &[Department]) -> PolarsResult<DataFrame> {
    df!(
        "code_reg" => departments
            .iter()
            .map(|d| d.region_code.as_deref().and_then(normalize_code))
            .collect::<Vec<_>>(),
        "code_dep" => departments.iter().map(|d| normalize_code(&d.code)).collect::<Vec<_>>(),
        "name_dep" => departments.iter().map(|d| d.name.clone()).collect::<Vec<_>>(),
    )
}

/// Left join of departments onto regions by region code.
///
/// One row per department, in input order. The region code is always the
/// department's declared one (null when the cell is blank); the region name
/// is null when no region matches. On duplicate region codes the first
/// region wins.
#[tracing::instrument(level = "info", skip_all, fields(regions = regions.len(), departments = departments.len()))]
pub fn merge_regions_and_departments(
    regions: &[Region],
    departments: &[Department],
) -> Result<DataFrame> {
    let regions = regions_frame(regions)?
        .lazy()
        .unique_stable(Some(vec!["code_reg".into()]), UniqueKeepStrategy::First);

    let areas = departments_frame(departments)?
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .join(
            regions,
            [col("code_reg")],
            [col("code_reg")],
            JoinArgs::new(JoinType::Left),
        )
        .sort([ROW_INDEX], Default::default())
        .select(select_columns(&AREA_COLUMNS))
        .collect()
        .context("joining departments onto regions")?;

    let unmatched = areas.column("name_reg")?.null_count();
    if unmatched > 0 {
        warn!(unmatched, "departments without a matching region");
    }
    info!(rows = areas.height(), "merged regions and departments");
    Ok(areas)
}
