use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// File the binary looks for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "referendum.yaml";

/// Input and output locations for one pipeline run.
///
/// Every key is optional in the YAML file; anything left out falls back to
/// the `data/` layout the datasets ship with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Semicolon-delimited referendum results.
    pub referendum_path: PathBuf,
    pub regions_path: PathBuf,
    pub departments_path: PathBuf,
    /// Region boundaries, one feature per region with a `code` property.
    pub geojson_path: PathBuf,
    /// Rendered SVG choropleth.
    pub map_path: PathBuf,
    /// Optional Parquet export of the per-region table.
    pub results_path: Option<PathBuf>,
    pub map_width: u32,
    pub map_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            referendum_path: PathBuf::from("data/referendum.csv"),
            regions_path: PathBuf::from("data/regions.csv"),
            departments_path: PathBuf::from("data/departments.csv"),
            geojson_path: PathBuf::from("data/regions.geojson"),
            map_path: PathBuf::from("output/referendum_map.svg"),
            results_path: None,
            map_width: 900,
            map_height: 800,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load `path` if it exists, otherwise use the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!(path = %path.display(), "loading config");
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}
