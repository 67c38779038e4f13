//! # WasteLens Catalog
//!
//! Scene discovery and export for the WasteLens pipeline:
//! - [`SceneSource`]: the seam between the pipeline and its imagery backend
//! - [`LocalSceneStore`]: manifest-driven scenes from local GeoTIFFs
//! - [`stac`]: async STAC item search for scene discovery
//! - [`export`]: GeoJSON export of detected sites

pub mod error;
pub mod export;
pub mod manifest;
pub mod source;
pub mod stac;
pub mod sync_api;

pub use error::{CatalogError, Result};
pub use manifest::SceneManifest;
pub use source::{LocalSceneStore, SceneSource};
