//! Result export

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{CatalogError, Result};
use wastelens_core::vector::FeatureCollection;

/// Serialize detected sites to a GeoJSON file.
///
/// The write happens off the async executor; the returned path is the one
/// actually written. Parent directories are created as needed.
pub async fn export_geojson(collection: &FeatureCollection, path: &Path) -> Result<PathBuf> {
    let text = collection.to_geojson()?;
    let path = path.to_path_buf();
    let written = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, text)?;
        Ok(path)
    })
    .await
    .map_err(|e| CatalogError::Network(format!("export task failed: {e}")))??;

    info!(path = %written.display(), "sites exported");
    Ok(written)
}
