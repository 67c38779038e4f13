//! Raster data structures

mod element;
mod geotransform;
mod grid;
mod stack;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Mask, Raster};
pub use stack::{Band, BandStack, ANALYSIS_BANDS};
