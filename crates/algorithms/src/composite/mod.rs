//! Temporal compositing
//!
//! Scenes are reduced to monthly composites, and monthly composites to a
//! period stack, with the same NaN-ignoring per-pixel median throughout.
//! A slot with no usable observations composites to NaN rather than
//! failing; sparse data is a property of the output, not an error.

mod monthly;
mod period;

pub use monthly::{
    monthly_optical_composite, monthly_radar_composite, to_db, MonthlyParams,
};
pub use period::period_stack;

use ndarray::Array2;

use crate::maybe_rayon::*;
use wastelens_core::raster::Raster;
use wastelens_core::{Error, Result};

/// Per-pixel median across a set of co-registered layers, ignoring NaN.
///
/// A pixel with no valid observation in any layer stays NaN. An empty
/// layer list is rejected; callers that can face zero layers build an
/// all-NaN raster on the target grid instead.
pub fn median_stack(layers: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let first = layers
        .first()
        .ok_or_else(|| Error::Algorithm("median over zero layers".into()))?;
    let (rows, cols) = first.shape();
    for layer in &layers[1..] {
        if layer.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: layer.rows(),
                ac: layer.cols(),
            });
        }
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values: Vec<f64> = Vec::with_capacity(layers.len());
            for col in 0..cols {
                values.clear();
                for layer in layers {
                    let v = unsafe { layer.get_unchecked(row, col) };
                    if !v.is_nan() {
                        values.push(v);
                    }
                }
                if !values.is_empty() {
                    row_data[col] = median_of(&mut values);
                }
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Median of a non-empty slice, averaging the middle pair for even counts.
/// Reorders the slice.
fn median_of(values: &mut [f64]) -> f64 {
    let n = values.len();
    let mid = n / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *m;
    if n % 2 == 1 {
        upper
    } else {
        let (_, l, _) = values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (*l + upper) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layer(values: &[f64], rows: usize, cols: usize) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), rows, cols).unwrap()
    }

    #[test]
    fn test_median_odd_and_even() {
        let a = layer(&[1.0], 1, 1);
        let b = layer(&[5.0], 1, 1);
        let c = layer(&[3.0], 1, 1);

        let odd = median_stack(&[&a, &b, &c]).unwrap();
        assert_relative_eq!(odd.get(0, 0).unwrap(), 3.0);

        let even = median_stack(&[&a, &b]).unwrap();
        assert_relative_eq!(even.get(0, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_median_skips_nan_observations() {
        let a = layer(&[f64::NAN], 1, 1);
        let b = layer(&[2.0], 1, 1);
        let c = layer(&[4.0], 1, 1);

        let out = median_stack(&[&a, &b, &c]).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_all_nan_pixel_stays_nan() {
        let a = layer(&[f64::NAN, 1.0], 1, 2);
        let b = layer(&[f64::NAN, 2.0], 1, 2);

        let out = median_stack(&[&a, &b]).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_relative_eq!(out.get(0, 1).unwrap(), 1.5);
    }

    #[test]
    fn test_empty_layer_list_rejected() {
        assert!(median_stack(&[]).is_err());
    }
}
