//! Spectral index computation

mod indices;

pub use indices::{append_indices, ndbi, ndvi, ndwi, normalized_difference};
