//! Debris change detection
//!
//! The detector compares a pre-period stack against a post-period stack
//! and flags pixels whose post-period spectral and radar signature matches
//! fresh debris: vegetation lost, built-up signal gained, dry surface,
//! strong backscatter. Thresholds come from regional quantiles of each
//! stack, with fixed fallbacks when a band is too sparse to characterize.

use tracing::{debug, warn};

use crate::change::components::filter_components;
use crate::change::quantiles::{region_quantiles, QuantileParams};
use crate::maybe_rayon::*;
use wastelens_core::raster::{Band, BandStack, Mask, Raster};
use wastelens_core::{Error, Result};

/// Fixed thresholds substituted when a quantile cannot be estimated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackThresholds {
    /// Post-period NDVI must be below this
    pub ndvi_max: f64,
    /// Post-period NDBI must be above this
    pub ndbi_min: f64,
    /// Post-period NDWI must be below this
    pub ndwi_max: f64,
    /// Post-period VV backscatter must be above this (dB)
    pub vv_min_db: f64,
}

impl Default for FallbackThresholds {
    fn default() -> Self {
        Self {
            ndvi_max: 0.30,
            ndbi_min: 0.015,
            ndwi_max: 0.15,
            vv_min_db: -13.0,
        }
    }
}

/// Parameters for change detection
#[derive(Debug, Clone)]
pub struct ChangeParams {
    /// Quantile sampling configuration (percentiles, scale, pixel budget)
    pub quantiles: QuantileParams,
    /// Minimum connected-component size in pixels
    pub min_component: usize,
    /// Saturation point for component counting
    pub component_cap: usize,
    /// Thresholds used when a quantile estimate is unavailable
    pub fallback: FallbackThresholds,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self {
            quantiles: QuantileParams::default(),
            min_component: 15,
            component_cap: 100,
            fallback: FallbackThresholds::default(),
        }
    }
}

/// The thresholds a detection run actually applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedThresholds {
    pub ndvi_max: f64,
    pub ndbi_min: f64,
    pub ndwi_max: f64,
    pub vv_min_db: f64,
    /// Which of the four thresholds fell back to fixed values
    pub fallbacks_used: u8,
}

/// Result of a change-detection run
#[derive(Debug, Clone)]
pub struct ChangeDetection {
    /// Debris-change mask after component filtering
    pub mask: Mask,
    /// Raw per-pixel predicate before component filtering
    pub raw_mask: Mask,
    pub thresholds: ResolvedThresholds,
}

/// Derive the four thresholds from the pre/post stacks.
///
/// Vegetation loss and surface drying are judged against the pre-period
/// distribution (low quantile of NDVI and NDWI); built-up gain and
/// backscatter against the post-period distribution (high quantile of
/// NDBI and VV). Any band too sparse to sample substitutes its fallback.
pub fn resolve_thresholds(
    pre: &BandStack,
    post: &BandStack,
    params: &ChangeParams,
) -> Result<ResolvedThresholds> {
    let q = &params.quantiles;
    let mut fallbacks_used = 0u8;

    let mut pick = |raster: &Raster<f64>, high: bool, fallback: f64, bit: u8| -> Result<f64> {
        match region_quantiles(raster, q)? {
            Some(pair) => Ok(if high { pair.high } else { pair.low }),
            None => {
                fallbacks_used |= bit;
                Ok(fallback)
            }
        }
    };

    let fb = params.fallback;
    let ndvi_max = pick(pre.band(Band::Ndvi)?, false, fb.ndvi_max, 0b0001)?;
    let ndbi_min = pick(post.band(Band::Ndbi)?, true, fb.ndbi_min, 0b0010)?;
    let ndwi_max = pick(pre.band(Band::Ndwi)?, false, fb.ndwi_max, 0b0100)?;
    let vv_min_db = pick(post.band(Band::Vv)?, true, fb.vv_min_db, 0b1000)?;

    if fallbacks_used != 0 {
        warn!(fallbacks_used, "quantile estimation fell back to fixed thresholds");
    }

    Ok(ResolvedThresholds {
        ndvi_max,
        ndbi_min,
        ndwi_max,
        vv_min_db,
        fallbacks_used,
    })
}

/// Detect debris-like change between two period stacks.
///
/// A pixel enters the raw mask only when all four post-period conditions
/// hold; a pixel with any absent band cannot match. The raw mask is then
/// cleaned of components smaller than `min_component` pixels.
pub fn detect_change(
    pre: &BandStack,
    post: &BandStack,
    params: &ChangeParams,
) -> Result<ChangeDetection> {
    let shape = post
        .shape()
        .ok_or_else(|| Error::Algorithm("post stack has no bands".into()))?;
    if pre.shape() != Some(shape) {
        let (er, ec) = shape;
        let (ar, ac) = pre.shape().unwrap_or((0, 0));
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let thresholds = resolve_thresholds(pre, post, params)?;
    debug!(?thresholds, "applying change predicate");

    let ndvi = post.band(Band::Ndvi)?;
    let ndbi = post.band(Band::Ndbi)?;
    let ndwi = post.band(Band::Ndwi)?;
    let vv = post.band(Band::Vv)?;

    let (rows, cols) = shape;
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let ndvi_v = unsafe { ndvi.get_unchecked(row, col) };
                let ndbi_v = unsafe { ndbi.get_unchecked(row, col) };
                let ndwi_v = unsafe { ndwi.get_unchecked(row, col) };
                let vv_v = unsafe { vv.get_unchecked(row, col) };

                // NaN comparisons are false, absent bands cannot match
                if ndvi_v < thresholds.ndvi_max
                    && ndbi_v > thresholds.ndbi_min
                    && ndwi_v < thresholds.ndwi_max
                    && vv_v > thresholds.vv_min_db
                {
                    row_data[col] = 1.0;
                }
            }
            row_data
        })
        .collect();

    let mut raw_mask = ndvi.with_same_meta::<f64>(rows, cols);
    raw_mask.set_nodata(Some(f64::NAN));
    *raw_mask.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mask = filter_components(&raw_mask, params.min_component, params.component_cap);
    debug!(
        raw = raw_mask.set_count(),
        kept = mask.set_count(),
        "change mask filtered"
    );

    Ok(ChangeDetection {
        mask,
        raw_mask,
        thresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wastelens_core::GeoTransform;

    fn band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r
    }

    /// Pre stack: vegetated, wet-ish, weak backscatter. Post stack: same
    /// unless overridden.
    fn stacks(rows: usize, cols: usize) -> (BandStack, BandStack) {
        let mut pre = BandStack::new();
        pre.insert(Band::Ndvi, band(rows, cols, 0.6)).unwrap();
        pre.insert(Band::Ndbi, band(rows, cols, -0.2)).unwrap();
        pre.insert(Band::Ndwi, band(rows, cols, 0.1)).unwrap();
        pre.insert(Band::Vv, band(rows, cols, -18.0)).unwrap();

        let post = pre.clone();
        (pre, post)
    }

    fn small_params() -> ChangeParams {
        ChangeParams {
            quantiles: QuantileParams {
                scale_m: 10.0,
                ..QuantileParams::default()
            },
            min_component: 2,
            ..ChangeParams::default()
        }
    }

    #[test]
    fn test_unchanged_scene_yields_empty_mask() {
        let (pre, post) = stacks(6, 6);
        let result = detect_change(&pre, &post, &small_params()).unwrap();
        assert_eq!(result.mask.set_count(), 0);
    }

    #[test]
    fn test_debris_signature_detected() {
        let (pre, mut post) = stacks(6, 6);
        // a 2x2 patch turns bare, built-up, dry, bright
        for &band_key in &[Band::Ndvi, Band::Ndbi, Band::Ndwi, Band::Vv] {
            let mut r = post.band(band_key).unwrap().clone();
            let v = match band_key {
                Band::Ndvi => -0.1,
                Band::Ndbi => 0.3,
                Band::Ndwi => -0.3,
                _ => -6.0,
            };
            for (row, col) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
                r.set(row, col, v).unwrap();
            }
            post = {
                let mut p = BandStack::new();
                for (b, existing) in post.iter() {
                    p.insert(b, if b == band_key { r.clone() } else { existing.clone() })
                        .unwrap();
                }
                p
            };
        }

        let result = detect_change(&pre, &post, &small_params()).unwrap();
        assert_eq!(result.mask.set_count(), 4);
        assert!(result.mask.is_set(2, 2));
        assert!(!result.mask.is_set(0, 0));
    }

    #[test]
    fn test_absent_band_pixel_cannot_match() {
        let (pre, mut post) = stacks(6, 6);
        let mut vv = post.band(Band::Vv).unwrap().clone();
        for row in 0..6 {
            for col in 0..6 {
                vv.set(row, col, f64::NAN).unwrap();
            }
        }
        let mut p = BandStack::new();
        for (b, existing) in post.iter() {
            p.insert(b, if b == Band::Vv { vv.clone() } else { existing.clone() })
                .unwrap();
        }
        post = p;

        let result = detect_change(&pre, &post, &small_params()).unwrap();
        assert_eq!(result.raw_mask.set_count(), 0);
        // all-NaN VV also forces the VV threshold onto its fallback
        assert_ne!(result.thresholds.fallbacks_used & 0b1000, 0);
        assert_eq!(result.thresholds.vv_min_db, -13.0);
    }

    #[test]
    fn test_fallbacks_exactly_substituted() {
        let rows = 4;
        let cols = 4;
        let nan_band = || {
            let mut r = band(rows, cols, f64::NAN);
            r.set_nodata(Some(f64::NAN));
            r
        };
        let mut pre = BandStack::new();
        pre.insert(Band::Ndvi, nan_band()).unwrap();
        pre.insert(Band::Ndbi, nan_band()).unwrap();
        pre.insert(Band::Ndwi, nan_band()).unwrap();
        pre.insert(Band::Vv, nan_band()).unwrap();
        let post = pre.clone();

        let t = resolve_thresholds(&pre, &post, &ChangeParams::default()).unwrap();
        let fb = FallbackThresholds::default();
        assert_eq!(t.ndvi_max, fb.ndvi_max);
        assert_eq!(t.ndbi_min, fb.ndbi_min);
        assert_eq!(t.ndwi_max, fb.ndwi_max);
        assert_eq!(t.vv_min_db, fb.vv_min_db);
        assert_eq!(t.fallbacks_used, 0b1111);
    }

    #[test]
    fn test_component_filter_applied() {
        let (pre, mut post) = stacks(8, 8);
        // single debris pixel, below min_component
        let mut p = BandStack::new();
        for (b, existing) in post.iter() {
            let mut r = existing.clone();
            let v = match b {
                Band::Ndvi => -0.1,
                Band::Ndbi => 0.3,
                Band::Ndwi => -0.3,
                Band::Vv => -6.0,
                _ => continue,
            };
            r.set(4, 4, v).unwrap();
            p.insert(b, r).unwrap();
        }
        post = p;

        let result = detect_change(&pre, &post, &small_params()).unwrap();
        assert_eq!(result.raw_mask.set_count(), 1);
        assert_eq!(result.mask.set_count(), 0);
    }
}
