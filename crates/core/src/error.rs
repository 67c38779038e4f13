//! Error types for WasteLens

use thiserror::Error;

/// Main error type for WasteLens operations.
///
/// Data sparsity (a month with zero scenes, a quantile that cannot be
/// computed) is deliberately NOT represented here: sparse data propagates
/// as all-NaN rasters or absent statistics, never as an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid AOI: {0}")]
    InvalidAoi(String),

    #[error("Invalid date window: start {start} is not before end {end}")]
    InvalidDateWindow { start: String, end: String },

    #[error("Date window {start}..{end} spans no full month")]
    EmptyWindow { start: String, end: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Band {0} not present in stack")]
    MissingBand(&'static str),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for WasteLens operations
pub type Result<T> = std::result::Result<T, Error>;
