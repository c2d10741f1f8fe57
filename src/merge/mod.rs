use anyhow::Result;
use polars::prelude::*;

pub mod areas;
pub mod codes;
pub mod referendum;

pub use areas::{merge_regions_and_departments, AREA_COLUMNS};
pub use codes::{is_overseas, normalize_code, normalize_opt, OVERSEAS_MARKER};
pub use referendum::{merge_referendum_and_areas, MERGED_COLUMNS};

/// Scratch column used to restore input order after a join.
pub(crate) const ROW_INDEX: &str = "__row";

/// Vote count columns, in file order.
pub const COUNT_COLUMNS: [&str; 5] = ["Registered", "Abstentions", "Null", "Choice A", "Choice B"];

pub(crate) fn select_columns(names: &[&str]) -> Vec<Expr> {
    names.iter().map(|name| col(*name)).collect()
}

/// Read a utf8 column out of a frame.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let ca = df.column(name)?.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Read a count column out of a frame; nulls count as zero.
pub fn u64_values(df: &DataFrame, name: &str) -> Result<Vec<u64>> {
    let ca = df.column(name)?.as_materialized_series().u64()?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
}
