use anyhow::{anyhow, bail, Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection};
use serde_json::Value as JsonValue;
use std::{fs, path::Path};
use tracing::info;

use super::types::RegionShape;

/// Read region boundaries from a GeoJSON FeatureCollection.
///
/// Every feature needs a `code` property and a Polygon or MultiPolygon
/// geometry; anything else makes the whole file malformed.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_region_shapes<P: AsRef<Path>>(path: P) -> Result<Vec<RegionShape>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    let collection: FeatureCollection = raw
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON file: {}", path.display()))?;

    let shapes = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            feature_to_shape(feature)
                .with_context(|| format!("feature #{} in {}", idx, path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(shapes = shapes.len(), "loaded region shapes");
    Ok(shapes)
}

fn feature_to_shape(feature: Feature) -> Result<RegionShape> {
    let code = feature
        .property("code")
        .and_then(property_to_string)
        .ok_or_else(|| anyhow!("missing `code` property"))?;
    let name = feature
        .property("nom")
        .or_else(|| feature.property("name"))
        .and_then(property_to_string);

    let value = feature
        .geometry
        .ok_or_else(|| anyhow!("region {} has no geometry", code))?
        .value;
    let geometry = match Geometry::<f64>::try_from(value)? {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        _ => bail!("region {} is not a polygon", code),
    };

    Ok(RegionShape {
        code,
        name,
        geometry,
    })
}

/// Codes show up as strings in most exports but as numbers in some.
fn property_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
