//! Blocking (synchronous) API
//!
//! Wraps the async client and exporter with a Tokio runtime so callers
//! like the CLI don't need to manage their own async runtime.

use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::export::export_geojson;
use crate::stac::{Item, ItemCollection, SearchParams, StacClient, StacClientOptions};
use wastelens_core::vector::FeatureCollection;

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CatalogError::Network(e.to_string()))
}

/// Blocking wrapper around [`StacClient`].
///
/// Uses an internal single-threaded Tokio runtime.
pub struct StacClientBlocking {
    rt: tokio::runtime::Runtime,
    inner: StacClient,
}

impl StacClientBlocking {
    /// Create a new blocking STAC client
    pub fn new(endpoint: &str, options: StacClientOptions) -> Result<Self> {
        let rt = runtime()?;
        let inner = StacClient::new(endpoint, options)?;
        Ok(Self { rt, inner })
    }

    /// Execute a single search request (blocking)
    pub fn search(&self, params: &SearchParams) -> Result<ItemCollection> {
        self.rt.block_on(self.inner.search(params))
    }

    /// Search with automatic pagination (blocking)
    pub fn search_all(&self, params: &SearchParams) -> Result<Vec<Item>> {
        self.rt.block_on(self.inner.search_all(params))
    }
}

/// One-shot blocking GeoJSON export
pub fn export_geojson_blocking(collection: &FeatureCollection, path: &Path) -> Result<PathBuf> {
    runtime()?.block_on(export_geojson(collection, path))
}
