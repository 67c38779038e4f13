//! # WasteLens Core
//!
//! Core types and I/O for the WasteLens change-detection pipeline.
//!
//! This crate provides:
//! - `Raster<T>` / `Mask`: georeferenced grids with NaN-as-absent semantics
//! - `BandStack`: co-registered multi-band imagery keyed by [`raster::Band`]
//! - `AreaOfInterest` / `DateWindow`: spatial and temporal scoping
//! - Scene types for optical and radar acquisitions
//! - Vector features with GeoJSON export
//! - Single-band GeoTIFF I/O

pub mod error;
pub mod geo;
pub mod io;
pub mod raster;
pub mod scene;
pub mod vector;

pub use error::{Error, Result};
pub use geo::{AreaOfInterest, DateWindow};
pub use raster::{Band, BandStack, GeoTransform, Mask, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::geo::{AreaOfInterest, DateWindow};
    pub use crate::raster::{Band, BandStack, GeoTransform, Mask, Raster, RasterElement};
}
