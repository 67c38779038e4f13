//! Regional quantile estimation
//!
//! Thresholds are derived from coarse quantiles of a band over the whole
//! AOI. Sampling happens on a strided sub-grid approximating the requested
//! statistics scale, and the stride is coarsened further if the sample
//! would exceed the pixel budget. Absent pixels never enter the sample.

use wastelens_core::raster::Raster;
use wastelens_core::{Error, Result};

/// Parameters for strided quantile sampling
#[derive(Debug, Clone)]
pub struct QuantileParams {
    /// Lower percentile, in (0, 50)
    pub qlow: f64,
    /// Upper percentile, in (50, 100)
    pub qhigh: f64,
    /// Statistics scale in metres; one sample per scale-sized block
    pub scale_m: f64,
    /// Hard cap on the number of sampled pixels
    pub max_pixels: usize,
}

impl Default for QuantileParams {
    fn default() -> Self {
        Self {
            qlow: 35.0,
            qhigh: 65.0,
            scale_m: 1000.0,
            max_pixels: 10_000_000,
        }
    }
}

impl QuantileParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.qlow > 0.0 && self.qlow < 50.0) {
            return Err(Error::InvalidParameter {
                name: "qlow",
                value: format!("{}", self.qlow),
                reason: "must be in (0, 50)".into(),
            });
        }
        if !(self.qhigh > 50.0 && self.qhigh < 100.0) {
            return Err(Error::InvalidParameter {
                name: "qhigh",
                value: format!("{}", self.qhigh),
                reason: "must be in (50, 100)".into(),
            });
        }
        if self.max_pixels == 0 {
            return Err(Error::InvalidParameter {
                name: "max_pixels",
                value: "0".into(),
                reason: "pixel budget must be positive".into(),
            });
        }
        Ok(())
    }
}

/// The low and high quantile of a band's valid pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantilePair {
    pub low: f64,
    pub high: f64,
}

/// Estimate the low/high quantiles of a raster's valid pixels.
///
/// Returns `None` when no valid pixel falls on the sampling grid; the
/// caller substitutes its fallback thresholds. The estimate is coarse on
/// purpose, it positions a threshold, it is not a statistic to report.
pub fn region_quantiles(raster: &Raster<f64>, params: &QuantileParams) -> Result<Option<QuantilePair>> {
    params.validate()?;

    let cell = raster.cell_size();
    let mut stride = if cell > 0.0 {
        ((params.scale_m / cell).round() as usize).max(1)
    } else {
        1
    };

    let (rows, cols) = raster.shape();
    // Coarsen until the sampling grid fits the budget
    while stride < rows.max(cols)
        && rows.div_ceil(stride) * cols.div_ceil(stride) > params.max_pixels
    {
        stride *= 2;
    }

    let mut samples: Vec<f64> = Vec::new();
    let mut row = 0;
    while row < rows {
        let mut col = 0;
        while col < cols {
            let v = unsafe { raster.get_unchecked(row, col) };
            if !v.is_nan() {
                samples.push(v);
            }
            col += stride;
        }
        row += stride;
    }

    if samples.is_empty() {
        return Ok(None);
    }

    samples.sort_unstable_by(|a, b| a.total_cmp(b));
    Ok(Some(QuantilePair {
        low: nearest_rank(&samples, params.qlow),
        high: nearest_rank(&samples, params.qhigh),
    }))
}

/// Nearest-rank percentile on a sorted slice
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let idx = (percentile / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
