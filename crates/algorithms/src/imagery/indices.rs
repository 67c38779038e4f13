//! Spectral indices
//!
//! The three normalized-difference indices the detector relies on, plus the
//! generic kernel they share. All operate on single-band rasters and
//! propagate NaN.

use ndarray::Array2;

use crate::maybe_rayon::*;
use wastelens_core::raster::{Band, BandStack, Raster};
use wastelens_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where either band is absent, or
/// where the denominator vanishes, are set to NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue;
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// High for vegetation, near zero for bare soil, negative for water.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Built-up Index
///
/// `NDBI = (SWIR - NIR) / (SWIR + NIR)`
///
/// Positive over built-up and bare surfaces, negative over vegetation.
pub fn ndbi(swir: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(swir, nir)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Derive NDVI, NDBI and NDWI from a stack's reflectance bands and append
/// them to the stack.
///
/// Requires B3, B4, B8 and B11 to be present.
pub fn append_indices(stack: &mut BandStack) -> Result<()> {
    let b3 = stack.band(Band::B3)?;
    let b4 = stack.band(Band::B4)?;
    let b8 = stack.band(Band::B8)?;
    let b11 = stack.band(Band::B11)?;

    let ndvi_r = ndvi(b8, b4)?;
    let ndbi_r = ndbi(b11, b8)?;
    let ndwi_r = ndwi(b3, b8)?;

    stack.insert(Band::Ndvi, ndvi_r)?;
    stack.insert(Band::Ndbi, ndbi_r)?;
    stack.insert(Band::Ndwi, ndwi_r)?;
    Ok(())
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wastelens_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndvi_vegetation() {
        let nir = make_band(3, 3, 0.8);
        let red = make_band(3, 3, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert_relative_eq!(result.get(1, 1).unwrap(), 0.7 / 0.9, epsilon = 1e-10);
    }

    #[test]
    fn test_nan_propagates() {
        let mut nir = make_band(3, 3, 0.8);
        nir.set(0, 0, f64::NAN).unwrap();
        let red = make_band(3, 3, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert!(!result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_zero_denominator_is_nan() {
        let a = make_band(2, 2, 0.0);
        let b = make_band(2, 2, 0.0);
        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_append_indices() {
        let mut stack = BandStack::new();
        stack.insert(Band::B2, make_band(2, 2, 0.05)).unwrap();
        stack.insert(Band::B3, make_band(2, 2, 0.08)).unwrap();
        stack.insert(Band::B4, make_band(2, 2, 0.1)).unwrap();
        stack.insert(Band::B8, make_band(2, 2, 0.6)).unwrap();
        stack.insert(Band::B11, make_band(2, 2, 0.3)).unwrap();

        append_indices(&mut stack).unwrap();
        assert!(stack.contains(Band::Ndvi));
        assert!(stack.contains(Band::Ndbi));
        assert!(stack.contains(Band::Ndwi));

        let ndwi_v = stack.band(Band::Ndwi).unwrap().get(0, 0).unwrap();
        assert!(ndwi_v < 0.0); // bright NIR, dim green: not water
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(3, 3, 0.5);
        let b = make_band(3, 4, 0.5);
        assert!(normalized_difference(&a, &b).is_err());
    }
}
