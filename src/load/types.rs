use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One line of the referendum results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferendumRow {
    #[serde(rename = "Department code")]
    pub department_code: String,
    #[serde(rename = "Department name")]
    pub department_name: String,
    #[serde(rename = "Registered")]
    pub registered: u64,
    #[serde(rename = "Abstentions")]
    pub abstentions: u64,
    #[serde(rename = "Null")]
    pub null: u64,
    #[serde(rename = "Choice A")]
    pub choice_a: u64,
    #[serde(rename = "Choice B")]
    pub choice_b: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub code: String,
    pub name: String,
    /// Blank cells come through as `None`.
    pub region_code: Option<String>,
}

/// A region boundary read from the GeoJSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionShape {
    /// Value of the feature's `code` property.
    pub code: String,
    /// `nom` or `name` property, when the feature has one.
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}
