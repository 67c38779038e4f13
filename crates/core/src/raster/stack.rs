//! Multi-band image stacks
//!
//! A [`BandStack`] is the pipeline's unit of multi-band imagery: a set of
//! co-registered single-band rasters keyed by [`Band`]. Every band in a
//! stack covers the identical grid (shape and transform); the invariant is
//! enforced on insert.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// The closed set of bands the pipeline works with.
///
/// Raw Sentinel-2 reflectance (B2/B3/B4/B8/B11), the three derived indices,
/// and Sentinel-1 backscatter in dB (VV/VH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    B2,
    B3,
    B4,
    B8,
    B11,
    Ndvi,
    Ndbi,
    Ndwi,
    Vv,
    Vh,
}

impl Band {
    /// Band label as used in scene manifests and attribute names
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::B2 => "B2",
            Band::B3 => "B3",
            Band::B4 => "B4",
            Band::B8 => "B8",
            Band::B11 => "B11",
            Band::Ndvi => "NDVI",
            Band::Ndbi => "NDBI",
            Band::Ndwi => "NDWI",
            Band::Vv => "VV",
            Band::Vh => "VH",
        }
    }

    /// Parse a band label
    pub fn parse(s: &str) -> Option<Band> {
        match s {
            "B2" => Some(Band::B2),
            "B3" => Some(Band::B3),
            "B4" => Some(Band::B4),
            "B8" => Some(Band::B8),
            "B11" => Some(Band::B11),
            "NDVI" => Some(Band::Ndvi),
            "NDBI" => Some(Band::Ndbi),
            "NDWI" => Some(Band::Ndwi),
            "VV" => Some(Band::Vv),
            "VH" => Some(Band::Vh),
            _ => None,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The analysis bands a period stack is restricted to before change
/// detection
pub const ANALYSIS_BANDS: [Band; 8] = [
    Band::B4,
    Band::B3,
    Band::B2,
    Band::Ndvi,
    Band::Ndbi,
    Band::Ndwi,
    Band::Vv,
    Band::Vh,
];

/// A set of co-registered single-band rasters keyed by band.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: BTreeMap<Band, Raster<f64>>,
}

impl BandStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self {
            bands: BTreeMap::new(),
        }
    }

    /// Insert a band, enforcing the co-registration invariant against any
    /// band already present.
    pub fn insert(&mut self, band: Band, raster: Raster<f64>) -> Result<()> {
        if let Some((_, existing)) = self.bands.iter().next() {
            if existing.shape() != raster.shape() {
                let (er, ec) = existing.shape();
                let (ar, ac) = raster.shape();
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
            if existing.transform() != raster.transform() {
                return Err(Error::Algorithm(format!(
                    "band {} is not co-registered with the stack",
                    band
                )));
            }
        }
        self.bands.insert(band, raster);
        Ok(())
    }

    /// Get a band by key
    pub fn band(&self, band: Band) -> Result<&Raster<f64>> {
        self.bands.get(&band).ok_or(Error::MissingBand(band.as_str()))
    }

    /// Get a band if present
    pub fn get(&self, band: Band) -> Option<&Raster<f64>> {
        self.bands.get(&band)
    }

    /// Whether the stack contains a band
    pub fn contains(&self, band: Band) -> bool {
        self.bands.contains_key(&band)
    }

    /// Iterate over (band, raster) pairs in band order
    pub fn iter(&self) -> impl Iterator<Item = (Band, &Raster<f64>)> {
        self.bands.iter().map(|(&b, r)| (b, r))
    }

    /// Band keys present, in band order
    pub fn band_keys(&self) -> Vec<Band> {
        self.bands.keys().copied().collect()
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether the stack has no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Shape shared by all bands, if any band is present
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.values().next().map(|r| r.shape())
    }

    /// Transform shared by all bands, if any band is present
    pub fn transform(&self) -> Option<GeoTransform> {
        self.bands.values().next().map(|r| *r.transform())
    }

    /// New stack containing only the requested bands (missing bands are
    /// skipped, matching select() semantics on sparse imagery)
    pub fn select(&self, bands: &[Band]) -> BandStack {
        let mut out = BandStack::new();
        for &b in bands {
            if let Some(r) = self.bands.get(&b) {
                out.bands.insert(b, r.clone());
            }
        }
        out
    }

    /// Merge another stack into this one, band by band
    pub fn merge(&mut self, other: BandStack) -> Result<()> {
        for (band, raster) in other.bands {
            self.insert(band, raster)?;
        }
        Ok(())
    }
}
