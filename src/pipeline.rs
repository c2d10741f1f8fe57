use anyhow::Result;
use tracing::info;

use crate::{
    aggregate::{compute_referendum_result_by_regions, RegionalResults},
    config::PipelineConfig,
    load::load_data,
    merge::{merge_referendum_and_areas, merge_regions_and_departments},
    render::{plot_referendum_map, ReferendumMap},
    report::write_results_parquet,
};

/// Everything one run produces besides the files it writes.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub results: RegionalResults,
    pub map: ReferendumMap,
}

/// Load → merge areas → merge referendum → aggregate → render, once.
#[tracing::instrument(level = "info", skip_all)]
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    let (referendum, regions, departments) = load_data(config)?;

    let areas = merge_regions_and_departments(&regions, &departments)?;
    let merged = merge_referendum_and_areas(&referendum, &areas)?;
    let results = compute_referendum_result_by_regions(&merged)?;

    if let Some(path) = &config.results_path {
        write_results_parquet(&results, path)?;
    }

    let map = plot_referendum_map(&results, config)?;
    info!(
        regions = results.len(),
        shapes = map.rows.len(),
        "pipeline finished"
    );
    Ok(PipelineOutput { results, map })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::tests::{init_test_logging, write_fixtures};
    use anyhow::Result;
    use std::fs;

    const SHAPES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"code":"84","nom":"Auvergne-Rhône-Alpes"},
         "geometry":{"type":"Polygon","coordinates":[[[3,45],[6,45],[6,46.5],[3,46.5],[3,45]]]}},
        {"type":"Feature","properties":{"code":"11","nom":"Île-de-France"},
         "geometry":{"type":"Polygon","coordinates":[[[1.5,48.1],[3.5,48.1],[3.5,49.2],[1.5,49.2],[1.5,48.1]]]}}
    ]}"#;

    #[test]
    fn end_to_end_keeps_metropolitan_rows_only() -> Result<()> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let mut cfg = write_fixtures(dir.path())?;
        cfg.results_path = Some(dir.path().join("out").join("results.parquet"));
        fs::write(&cfg.geojson_path, SHAPES)?;

        let out = run(&cfg)?;

        // 971 and ZZ never reach the aggregation
        assert_eq!(out.results.len(), 1);
        let ara = out.results.get("84").expect("region 84");
        assert_eq!(ara.choice_a, 600);
        assert_eq!(ara.choice_b, 400);
        assert_eq!(ara.registered, 1200);
        assert!(out.results.get("01").is_none());

        assert!(cfg.map_path.exists());
        assert!(cfg.results_path.as_ref().unwrap().exists());

        assert_eq!(out.map.rows.len(), 2);
        assert!((out.map.get("84").unwrap().ratio - 0.6).abs() < 1e-12);
        assert!(out.map.get("11").unwrap().ratio.is_nan());
        Ok(())
    }

    #[test]
    fn missing_geojson_aborts_the_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = write_fixtures(dir.path())?;
        let err = run(&cfg).unwrap_err();
        assert!(format!("{:#}", err).contains("regions.geojson"));
        Ok(())
    }
}
