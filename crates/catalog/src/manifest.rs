//! Local scene manifests
//!
//! A manifest is a JSON file describing scenes already downloaded to disk,
//! one GeoTIFF per band. It is the offline counterpart of a STAC search:
//! the CLI points the pipeline at a manifest and never touches the network.
//!
//! ```json
//! {
//!   "optical": [
//!     {
//!       "date": "2023-06-10",
//!       "cloud_cover": 12.5,
//!       "bands": { "B2": "s2/0610_B2.tif", "B3": "s2/0610_B3.tif" },
//!       "scl": "s2/0610_SCL.tif"
//!     }
//!   ],
//!   "radar": [
//!     { "date": "2023-06-15", "vv": "s1/0615_vv.tif", "vh": "s1/0615_vh.tif" }
//!   ]
//! }
//! ```
//!
//! Band paths are relative to the manifest file's directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use wastelens_core::raster::Band;

/// One optical scene entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpticalEntry {
    pub date: NaiveDate,
    pub cloud_cover: f64,
    /// Band label (B2, B3, B4, B8, B11) to GeoTIFF path
    pub bands: HashMap<String, PathBuf>,
    /// Path to the SCL quality band
    pub scl: PathBuf,
}

/// One radar scene entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarEntry {
    pub date: NaiveDate,
    /// VV backscatter in linear power
    pub vv: PathBuf,
    /// VH backscatter in linear power
    pub vh: PathBuf,
}

/// A parsed scene manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub optical: Vec<OpticalEntry>,
    #[serde(default)]
    pub radar: Vec<RadarEntry>,
}

impl SceneManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: SceneManifest =
            serde_json::from_str(text).map_err(|e| CatalogError::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.optical {
            if !(0.0..=100.0).contains(&entry.cloud_cover) {
                return Err(CatalogError::Manifest(format!(
                    "scene {}: cloud cover {} out of range",
                    entry.date, entry.cloud_cover
                )));
            }
            for label in entry.bands.keys() {
                match Band::parse(label) {
                    Some(Band::B2 | Band::B3 | Band::B4 | Band::B8 | Band::B11) => {}
                    _ => {
                        return Err(CatalogError::Manifest(format!(
                            "scene {}: unknown reflectance band {label:?}",
                            entry.date
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_manifest() {
        let text = r#"{
            "optical": [{
                "date": "2023-06-10",
                "cloud_cover": 12.5,
                "bands": { "B2": "a.tif", "B4": "b.tif" },
                "scl": "scl.tif"
            }],
            "radar": [{ "date": "2023-06-15", "vv": "vv.tif", "vh": "vh.tif" }]
        }"#;
        let manifest = SceneManifest::from_json(text).unwrap();
        assert_eq!(manifest.optical.len(), 1);
        assert_eq!(manifest.radar.len(), 1);
        assert_eq!(
            manifest.optical[0].date,
            NaiveDate::from_ymd_opt(2023, 6, 10).unwrap()
        );
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let manifest = SceneManifest::from_json("{}").unwrap();
        assert!(manifest.optical.is_empty());
        assert!(manifest.radar.is_empty());
    }

    #[test]
    fn test_unknown_band_rejected() {
        let text = r#"{
            "optical": [{
                "date": "2023-06-10",
                "cloud_cover": 5.0,
                "bands": { "B99": "a.tif" },
                "scl": "scl.tif"
            }]
        }"#;
        assert!(SceneManifest::from_json(text).is_err());
    }

    #[test]
    fn test_derived_band_rejected_as_input() {
        let text = r#"{
            "optical": [{
                "date": "2023-06-10",
                "cloud_cover": 5.0,
                "bands": { "NDVI": "a.tif" },
                "scl": "scl.tif"
            }]
        }"#;
        assert!(SceneManifest::from_json(text).is_err());
    }

    #[test]
    fn test_bad_cloud_cover_rejected() {
        let text = r#"{
            "optical": [{
                "date": "2023-06-10",
                "cloud_cover": 150.0,
                "bands": {},
                "scl": "scl.tif"
            }]
        }"#;
        assert!(SceneManifest::from_json(text).is_err());
    }
}
