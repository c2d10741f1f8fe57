use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use polars::prelude::*;
use std::{
    collections::{btree_map, BTreeMap},
    sync::Arc,
};
use tracing::{debug, info};

use crate::merge::{str_values, u64_values, COUNT_COLUMNS};

/// Summed vote counts for one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionResult {
    pub name_reg: Option<String>,
    pub registered: u64,
    pub abstentions: u64,
    pub null: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl RegionResult {
    /// Share of Choice A among expressed ballots; NaN when nobody chose.
    pub fn ratio(&self) -> f64 {
        let a = self.choice_a as f64;
        a / (a + self.choice_b as f64)
    }
}

/// Per-region results keyed and ordered by region code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionalResults {
    rows: BTreeMap<String, RegionResult>,
}

impl RegionalResults {
    pub const COLUMNS: [&'static str; 7] = [
        "code_reg",
        "name_reg",
        "Registered",
        "Abstentions",
        "Null",
        "Choice A",
        "Choice B",
    ];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, code_reg: &str) -> Option<&RegionResult> {
        self.rows.get(code_reg)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RegionResult> {
        self.rows.iter()
    }

    /// Columnar view of the table, one row per region.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> = Self::COLUMNS
            .iter()
            .map(|name| match *name {
                "code_reg" => Field::new(*name, DataType::Utf8, false),
                "name_reg" => Field::new(*name, DataType::Utf8, true),
                _ => Field::new(*name, DataType::UInt64, false),
            })
            .collect();

        let counts = |f: fn(&RegionResult) -> u64| -> ArrayRef {
            Arc::new(UInt64Array::from_iter_values(self.rows.values().map(f)))
        };
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(self.rows.keys())),
            Arc::new(
                self.rows
                    .values()
                    .map(|r| r.name_reg.as_deref())
                    .collect::<StringArray>(),
            ),
            counts(|r| r.registered),
            counts(|r| r.abstentions),
            counts(|r| r.null),
            counts(|r| r.choice_a),
            counts(|r| r.choice_b),
        ];

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
            .context("building regional results batch")
    }
}

impl<'a> IntoIterator for &'a RegionalResults {
    type Item = (&'a String, &'a RegionResult);
    type IntoIter = btree_map::Iter<'a, String, RegionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<(String, RegionResult)> for RegionalResults {
    fn from_iter<I: IntoIterator<Item = (String, RegionResult)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl RegionalResults {
    /// Typed view of the grouped frame (`code_reg`, `name_reg`, counts).
    fn from_frame(df: &DataFrame) -> Result<Self> {
        let codes = str_values(df, "code_reg")?;
        let names = str_values(df, "name_reg")?;
        let counts = COUNT_COLUMNS
            .iter()
            .map(|name| u64_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        let rows = codes
            .into_iter()
            .zip(names)
            .enumerate()
            .filter_map(|(i, (code, name_reg))| {
                code.map(|code| {
                    let result = RegionResult {
                        name_reg,
                        registered: counts[0][i],
                        abstentions: counts[1][i],
                        null: counts[2][i],
                        choice_a: counts[3][i],
                        choice_b: counts[4][i],
                    };
                    (code, result)
                })
            })
            .collect();
        Ok(Self { rows })
    }
}

/// The grand total of a column bounds every group's sum, so checking it once
/// is enough to keep the grouped sums from wrapping.
fn ensure_totals_fit(rows: &DataFrame) -> Result<()> {
    for name in COUNT_COLUMNS {
        let total = u64_values(rows, name)?
            .into_iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v));
        if total.is_none() {
            bail!("`{}` total overflows u64", name);
        }
    }
    Ok(())
}

/// Group merged rows by region code and sum the vote counts.
///
/// Rows without a region code are left out. The region name is the first
/// non-empty one seen in each group.
#[tracing::instrument(level = "info", skip_all, fields(rows = rows.height()))]
pub fn compute_referendum_result_by_regions(rows: &DataFrame) -> Result<RegionalResults> {
    ensure_totals_fit(rows)?;

    let without_region = rows.column("code_reg")?.null_count();
    if without_region > 0 {
        debug!(without_region, "skipping rows without region");
    }

    let mut aggs = vec![col("name_reg").drop_nulls().first()];
    aggs.extend(COUNT_COLUMNS.iter().map(|name| col(*name).sum()));

    let grouped = rows
        .clone()
        .lazy()
        .filter(col("code_reg").is_not_null())
        .group_by([col("code_reg")])
        .agg(aggs)
        .sort(["code_reg"], Default::default())
        .collect()
        .context("grouping referendum by region")?;

    let results = RegionalResults::from_frame(&grouped)?;
    info!(regions = results.len(), "aggregated referendum by region");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use arrow::array::Array;

    /// Merged-table stand-in: (code_dep, code_reg, name_reg, registered, choice_a, choice_b).
    fn merged(rows: &[(&str, Option<&str>, Option<&str>, u64, u64, u64)]) -> Result<DataFrame> {
        let df = df!(
            "code_dep" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "name_dep" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "Registered" => rows.iter().map(|r| r.3).collect::<Vec<u64>>(),
            "Abstentions" => rows.iter().map(|r| r.3 / 10).collect::<Vec<u64>>(),
            "Null" => rows.iter().map(|_| 1u64).collect::<Vec<u64>>(),
            "Choice A" => rows.iter().map(|r| r.4).collect::<Vec<u64>>(),
            "Choice B" => rows.iter().map(|r| r.5).collect::<Vec<u64>>(),
            "code_reg" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "name_reg" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        )?;
        Ok(df)
    }

    #[test]
    fn sums_counts_per_region() -> Result<()> {
        let rows = merged(&[
            ("01", Some("84"), Some("Auvergne-Rhône-Alpes"), 1000, 300, 200),
            ("75", Some("11"), Some("Île-de-France"), 5000, 2000, 1000),
            ("03", Some("84"), Some("Auvergne-Rhône-Alpes"), 2000, 700, 500),
        ])?;

        let results = compute_referendum_result_by_regions(&rows)?;

        assert_eq!(results.len(), 2);
        let ara = results.get("84").expect("region 84");
        assert_eq!(ara.name_reg.as_deref(), Some("Auvergne-Rhône-Alpes"));
        assert_eq!(ara.registered, 3000);
        assert_eq!(ara.abstentions, 300);
        assert_eq!(ara.null, 2);
        assert_eq!(ara.choice_a, 1000);
        assert_eq!(ara.choice_b, 700);

        // ordered by region code
        let codes: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, ["11", "84"]);
        Ok(())
    }

    #[test]
    fn first_non_empty_name_wins() -> Result<()> {
        let rows = merged(&[
            ("01", Some("84"), None, 10, 1, 1),
            ("03", Some("84"), Some("Auvergne-Rhône-Alpes"), 10, 1, 1),
        ])?;

        let results = compute_referendum_result_by_regions(&rows)?;
        assert_eq!(
            results.get("84").unwrap().name_reg.as_deref(),
            Some("Auvergne-Rhône-Alpes")
        );
        Ok(())
    }

    #[test]
    fn rows_without_region_are_left_out() -> Result<()> {
        let rows = merged(&[
            ("99", None, None, 10, 1, 1),
            ("01", Some("84"), Some("Auvergne-Rhône-Alpes"), 10, 1, 1),
        ])?;
        let results = compute_referendum_result_by_regions(&rows)?;
        assert_eq!(results.len(), 1);
        assert!(results.get("84").is_some());
        Ok(())
    }

    #[test]
    fn blank_region_code_never_becomes_a_region() -> Result<()> {
        use crate::load::{Department, ReferendumRow, Region};
        use crate::merge::{merge_referendum_and_areas, merge_regions_and_departments};

        let regions = vec![Region {
            code: "32".into(),
            name: "Hauts-de-France".into(),
        }];
        let departments = vec![Department {
            code: "02".into(),
            name: "Aisne".into(),
            region_code: None,
        }];
        let referendum = vec![ReferendumRow {
            department_code: "02".into(),
            department_name: "AISNE".into(),
            registered: 20,
            abstentions: 0,
            null: 0,
            choice_a: 5,
            choice_b: 5,
        }];

        let areas = merge_regions_and_departments(&regions, &departments)?;
        let rows = merge_referendum_and_areas(&referendum, &areas)?;
        let results = compute_referendum_result_by_regions(&rows)?;

        assert!(results.get("00").is_none());
        assert!(results.is_empty());
        Ok(())
    }

    #[test]
    fn overflowing_totals_are_an_error() -> Result<()> {
        let rows = merged(&[
            ("01", Some("84"), None, u64::MAX, 1, 1),
            ("03", Some("84"), None, 1, 1, 1),
        ])?;
        let err = compute_referendum_result_by_regions(&rows).unwrap_err();
        assert!(err.to_string().contains("Registered"));
        Ok(())
    }

    #[test]
    fn ratio_is_bounded_or_nan() {
        let split = RegionResult {
            choice_a: 600,
            choice_b: 400,
            ..Default::default()
        };
        assert!((split.ratio() - 0.6).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&split.ratio()));
        assert!(RegionResult::default().ratio().is_nan());
    }

    #[test]
    fn record_batch_has_one_row_per_region() -> Result<()> {
        let rows = merged(&[
            ("01", Some("84"), None, 1000, 600, 400),
            ("75", Some("11"), Some("Île-de-France"), 5000, 2000, 1000),
        ])?;
        let results = compute_referendum_result_by_regions(&rows)?;

        let batch = results.to_record_batch()?;
        assert_eq!(batch.num_rows(), 2);
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, RegionalResults::COLUMNS);

        let name_reg = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("name_reg is utf8");
        assert!(name_reg.is_null(1));
        let choice_a = batch
            .column(5)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .expect("Choice A is u64");
        assert_eq!(choice_a.value(1), 600);
        Ok(())
    }
}
