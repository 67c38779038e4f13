//! Scene sources
//!
//! The pipeline asks a [`SceneSource`] for every scene touching an AOI and
//! window; where the pixels come from (local files, an object store, a
//! download cache) is the source's business.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::manifest::SceneManifest;
use wastelens_core::io::read_geotiff;
use wastelens_core::raster::{Band, BandStack, Raster};
use wastelens_core::scene::{OpticalScene, RadarScene};
use wastelens_core::{AreaOfInterest, DateWindow};

/// Something that can enumerate and load scenes for an AOI and window.
///
/// Implementations return scenes already resampled to a common grid; the
/// pipeline trusts co-registration and enforces it when stacking.
pub trait SceneSource {
    /// Optical scenes within the window, at or under the cloud threshold
    fn optical_scenes(
        &self,
        aoi: &AreaOfInterest,
        window: &DateWindow,
        max_cloud: f64,
    ) -> Result<Vec<OpticalScene>>;

    /// Radar scenes within the window
    fn radar_scenes(&self, aoi: &AreaOfInterest, window: &DateWindow)
        -> Result<Vec<RadarScene>>;
}

/// A scene source backed by a manifest of GeoTIFFs on local disk.
pub struct LocalSceneStore {
    manifest: SceneManifest,
    base_dir: PathBuf,
}

impl LocalSceneStore {
    /// Open a store from a manifest file; band paths resolve against the
    /// manifest's directory.
    pub fn open(manifest_path: impl Into<PathBuf>) -> Result<Self> {
        let path: PathBuf = manifest_path.into();
        let manifest = SceneManifest::load(&path)?;
        let base_dir = path.parent().map(PathBuf::from).unwrap_or_default();
        Ok(Self { manifest, base_dir })
    }

    /// Build a store from an already-parsed manifest
    pub fn from_manifest(manifest: SceneManifest, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, relative: &std::path::Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_dir.join(relative)
        }
    }
}

impl SceneSource for LocalSceneStore {
    fn optical_scenes(
        &self,
        _aoi: &AreaOfInterest,
        window: &DateWindow,
        max_cloud: f64,
    ) -> Result<Vec<OpticalScene>> {
        let mut scenes = Vec::new();
        for entry in &self.manifest.optical {
            if !window.contains(entry.date) || entry.cloud_cover > max_cloud {
                continue;
            }

            let mut bands = BandStack::new();
            for (label, path) in &entry.bands {
                let band = Band::parse(label).ok_or_else(|| {
                    CatalogError::Manifest(format!("unknown band label {label:?}"))
                })?;
                let raster: Raster<f64> = read_geotiff(self.resolve(path))?;
                bands.insert(band, raster)?;
            }
            let scl: Raster<u8> = read_geotiff(self.resolve(&entry.scl))?;

            scenes.push(OpticalScene {
                date: entry.date,
                cloud_cover: entry.cloud_cover,
                bands,
                scl,
            });
        }
        debug!(count = scenes.len(), "loaded optical scenes from manifest");
        Ok(scenes)
    }

    fn radar_scenes(
        &self,
        _aoi: &AreaOfInterest,
        window: &DateWindow,
    ) -> Result<Vec<RadarScene>> {
        let mut scenes = Vec::new();
        for entry in &self.manifest.radar {
            if !window.contains(entry.date) {
                continue;
            }
            let vv: Raster<f64> = read_geotiff(self.resolve(&entry.vv))?;
            let vh: Raster<f64> = read_geotiff(self.resolve(&entry.vh))?;
            scenes.push(RadarScene {
                date: entry.date,
                vv,
                vh,
            });
        }
        debug!(count = scenes.len(), "loaded radar scenes from manifest");
        Ok(scenes)
    }
}
