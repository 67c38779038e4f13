//! Water masking and the water-proximity combiner

use ndarray::Array2;
use tracing::debug;

use crate::maybe_rayon::*;
use crate::morphology::dilate_mask;
use wastelens_core::raster::{Band, BandStack, Mask};
use wastelens_core::{Error, Result};

/// Parameters for the water mask
#[derive(Debug, Clone)]
pub struct WaterMaskParams {
    /// NDWI above this marks open water
    pub ndwi_threshold: f64,
}

impl Default for WaterMaskParams {
    fn default() -> Self {
        Self { ndwi_threshold: 0.20 }
    }
}

/// Parameters for the proximity combiner
#[derive(Debug, Clone)]
pub struct ProximityParams {
    /// How far from a change pixel water still counts as "near", in metres
    pub buffer_m: f64,
}

impl Default for ProximityParams {
    fn default() -> Self {
        Self { buffer_m: 50.0 }
    }
}

/// Mark open water in a period stack: pixels whose NDWI exceeds the
/// threshold. Everything else, including absent NDWI, is absent.
pub fn water_mask(stack: &BandStack, params: &WaterMaskParams) -> Result<Mask> {
    let ndwi = stack.band(Band::Ndwi)?;
    let (rows, cols) = ndwi.shape();
    let threshold = params.ndwi_threshold;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { ndwi.get_unchecked(row, col) };
                if v > threshold {
                    row_data[col] = 1.0;
                }
            }
            row_data
        })
        .collect();

    let mut output = ndwi.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Water within reach of detected change.
///
/// The change mask is dilated by the buffer distance (disk radius rounded
/// up to whole cells) and intersected with the water mask. Water is
/// unmasked to 0 first so that absent water reads as "no water" instead of
/// knocking pixels out of the intersection.
pub fn water_near_change(
    change: &Mask,
    water: &Mask,
    params: &ProximityParams,
) -> Result<Mask> {
    if change.shape() != water.shape() {
        let (er, ec) = change.shape();
        let (ar, ac) = water.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    let cell = change.cell_size();
    if !(cell > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: format!("{cell}"),
            reason: "change mask has no metric grid".into(),
        });
    }

    let radius = (params.buffer_m / cell).ceil() as usize;
    debug!(radius, buffer_m = params.buffer_m, "dilating change mask");
    let reach = dilate_mask(change, radius)?;
    let water_filled = water.unmask(0.0);

    let (rows, cols) = change.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let w = unsafe { water_filled.get_unchecked(row, col) };
                if w != 0.0 && reach.is_set(row, col) {
                    row_data[col] = 1.0;
                }
            }
            row_data
        })
        .collect();

    let mut output = change.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
