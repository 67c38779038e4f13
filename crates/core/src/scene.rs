//! Acquired scene types
//!
//! Scenes are single acquisitions already resampled to the AOI grid:
//! optical scenes carry surface reflectance plus the scene classification
//! (SCL) quality band, radar scenes carry linear-power backscatter.

use chrono::NaiveDate;

use crate::raster::{BandStack, Raster};

/// Sentinel-2 scene classification (SCL) class codes
pub mod scl {
    pub const NO_DATA: u8 = 0;
    pub const SATURATED: u8 = 1;
    pub const DARK_AREA: u8 = 2;
    pub const CLOUD_SHADOW: u8 = 3;
    pub const VEGETATION: u8 = 4;
    pub const NOT_VEGETATED: u8 = 5;
    pub const WATER: u8 = 6;
    pub const UNCLASSIFIED: u8 = 7;
    pub const CLOUD_MEDIUM_PROB: u8 = 8;
    pub const CLOUD_HIGH_PROB: u8 = 9;
    pub const THIN_CIRRUS: u8 = 10;
    pub const SNOW: u8 = 11;
}

/// SCL classes kept under the strict quality screen
pub const SCL_KEEP_STRICT: [u8; 5] = [
    scl::VEGETATION,
    scl::NOT_VEGETATED,
    scl::WATER,
    scl::UNCLASSIFIED,
    scl::SNOW,
];

/// Additional SCL classes admitted when the screen is loosened for sparse
/// months (cloud shadow and medium-probability cloud)
pub const SCL_KEEP_LOOSE_EXTRA: [u8; 2] = [scl::CLOUD_SHADOW, scl::CLOUD_MEDIUM_PROB];

/// An optical (Sentinel-2 style) acquisition on the AOI grid.
#[derive(Debug, Clone)]
pub struct OpticalScene {
    /// Acquisition date
    pub date: NaiveDate,
    /// Scene-level cloudy pixel percentage, 0..100
    pub cloud_cover: f64,
    /// Reflectance bands (B2, B3, B4, B8, B11)
    pub bands: BandStack,
    /// Scene classification quality band, co-registered with `bands`
    pub scl: Raster<u8>,
}

/// A radar (Sentinel-1 style) acquisition on the AOI grid, both
/// polarisations in linear power.
#[derive(Debug, Clone)]
pub struct RadarScene {
    /// Acquisition date
    pub date: NaiveDate,
    /// VV backscatter, linear power
    pub vv: Raster<f64>,
    /// VH backscatter, linear power
    pub vh: Raster<f64>,
}
