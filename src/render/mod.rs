use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use geo::MultiPolygon;
use std::{fs, path::Path, sync::Arc};
use tracing::{info, warn};

use crate::{
    aggregate::{RegionResult, RegionalResults},
    config::PipelineConfig,
    load::{load_region_shapes, RegionShape},
    merge::normalize_code,
};

pub mod colormap;
pub mod svg;

/// One region geometry with its joined result.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRow {
    /// Zero-padded geometry code.
    pub code: String,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
    /// `None` when the aggregated table has no such region.
    pub result: Option<RegionResult>,
    /// Choice A / (Choice A + Choice B); NaN when undefined.
    pub ratio: f64,
}

/// The joined map table returned after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferendumMap {
    pub rows: Vec<MapRow>,
}

impl ReferendumMap {
    pub fn get(&self, code: &str) -> Option<&MapRow> {
        self.rows.iter().find(|r| r.code == code)
    }

    /// The map table without geometries.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            Field::new("code", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("Registered", DataType::UInt64, true),
            Field::new("Abstentions", DataType::UInt64, true),
            Field::new("Null", DataType::UInt64, true),
            Field::new("Choice A", DataType::UInt64, true),
            Field::new("Choice B", DataType::UInt64, true),
            Field::new("ratio", DataType::Float64, false),
        ]);

        let counts = |f: fn(&RegionResult) -> u64| -> ArrayRef {
            Arc::new(
                self.rows
                    .iter()
                    .map(|r| r.result.as_ref().map(f))
                    .collect::<UInt64Array>(),
            )
        };
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(self.rows.iter().map(|r| &r.code))),
            Arc::new(
                self.rows
                    .iter()
                    .map(|r| r.name.as_deref())
                    .collect::<StringArray>(),
            ),
            counts(|r| r.registered),
            counts(|r| r.abstentions),
            counts(|r| r.null),
            counts(|r| r.choice_a),
            counts(|r| r.choice_b),
            Arc::new(Float64Array::from_iter_values(self.rows.iter().map(|r| r.ratio))),
        ];

        RecordBatch::try_new(Arc::new(schema), columns).context("building map batch")
    }
}

/// Left join of the shapes onto the regional results by region code.
///
/// Every shape yields exactly one row, in input order. The display name is
/// the shape's own name, or the region name from the results.
pub fn build_map_rows(shapes: Vec<RegionShape>, results: &RegionalResults) -> Vec<MapRow> {
    shapes
        .into_iter()
        .map(|shape| {
            let code = normalize_code(&shape.code).unwrap_or_else(|| shape.code.clone());
            let result = results.get(&code).cloned();
            if result.is_none() {
                warn!(code = %code, "region shape has no referendum result");
            }
            let ratio = result.as_ref().map_or(f64::NAN, RegionResult::ratio);
            let name = shape
                .name
                .or_else(|| result.as_ref().and_then(|r| r.name_reg.clone()));
            MapRow {
                code,
                name,
                geometry: shape.geometry,
                result,
                ratio,
            }
        })
        .collect()
}

/// Join `results` onto the region shapes, write the choropleth to
/// `config.map_path` and hand back the joined table.
#[tracing::instrument(level = "info", skip_all, fields(map = %config.map_path.display()))]
pub fn plot_referendum_map(
    results: &RegionalResults,
    config: &PipelineConfig,
) -> Result<ReferendumMap> {
    let shapes = load_region_shapes(&config.geojson_path)?;
    let rows = build_map_rows(shapes, results);

    let doc = svg::render_svg(&rows, config.map_width, config.map_height)?;
    write_map(&config.map_path, &doc)?;

    info!(regions = rows.len(), "rendered referendum map");
    Ok(ReferendumMap { rows })
}

fn write_map(path: &Path, doc: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating map directory {}", parent.display()))?;
    }
    fs::write(path, doc).with_context(|| format!("writing map {}", path.display()))
}
