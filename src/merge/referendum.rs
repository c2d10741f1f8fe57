use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, warn};

use super::{
    codes::{is_overseas, normalize_code},
    select_columns, COUNT_COLUMNS, ROW_INDEX,
};
use crate::load::ReferendumRow;

/// Column layout of the merged referendum table.
pub const MERGED_COLUMNS: [&str; 9] = [
    "code_dep",
    "name_dep",
    "Registered",
    "Abstentions",
    "Null",
    "Choice A",
    "Choice B",
    "code_reg",
    "name_reg",
];

const OVERSEAS: &str = "overseas";

fn referendum_frame(referendum: &[ReferendumRow]) -> PolarsResult<DataFrame> {
    let codes: Vec<Option<String>> = referendum
        .iter()
        .map(|r| normalize_code(&r.department_code))
        .collect();
    let overseas: Vec<bool> = codes
        .iter()
        .map(|c| c.as_deref().is_some_and(is_overseas))
        .collect();
    let counts = |f: fn(&ReferendumRow) -> u64| referendum.iter().map(f).collect::<Vec<u64>>();

    df!(
        "code_dep" => codes,
        OVERSEAS => overseas,
        "name_dep" => referendum.iter().map(|r| r.department_name.clone()).collect::<Vec<_>>(),
        COUNT_COLUMNS[0] => counts(|r| r.registered),
        COUNT_COLUMNS[1] => counts(|r| r.abstentions),
        COUNT_COLUMNS[2] => counts(|r| r.null),
        COUNT_COLUMNS[3] => counts(|r| r.choice_a),
        COUNT_COLUMNS[4] => counts(|r| r.choice_b),
    )
}

/// Drop overseas rows, then left-join the referendum onto the areas by
/// department code.
///
/// Output order follows `referendum`. Only the area's region columns are
/// joined, so the department name is the referendum's own spelling.
#[tracing::instrument(level = "info", skip_all, fields(referendum = referendum.len(), areas = areas.height()))]
pub fn merge_referendum_and_areas(
    referendum: &[ReferendumRow],
    areas: &DataFrame,
) -> Result<DataFrame> {
    let areas = areas
        .clone()
        .lazy()
        .select([col("code_dep"), col("code_reg"), col("name_reg")])
        .unique_stable(Some(vec!["code_dep".into()]), UniqueKeepStrategy::First);

    let merged = referendum_frame(referendum)?
        .lazy()
        .filter(col(OVERSEAS).not())
        .with_row_index(ROW_INDEX, None)
        .join(
            areas,
            [col("code_dep")],
            [col("code_dep")],
            JoinArgs::new(JoinType::Left),
        )
        .sort([ROW_INDEX], Default::default())
        .select(select_columns(&MERGED_COLUMNS))
        .collect()
        .context("joining referendum onto areas")?;

    let unmatched = merged.column("code_reg")?.null_count();
    if unmatched > 0 {
        warn!(unmatched, "referendum rows without an area");
    }
    info!(
        rows = merged.height(),
        dropped = referendum.len() - merged.height(),
        "merged referendum and areas"
    );
    Ok(merged)
}
