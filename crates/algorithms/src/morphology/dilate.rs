//! Mask dilation (morphological max with absent-as-unset semantics)

use ndarray::Array2;

use crate::maybe_rayon::*;
use wastelens_core::raster::Mask;
use wastelens_core::{Error, Result};

/// Offsets of a disk-shaped structuring element of the given pixel radius.
///
/// Includes the center; a radius of 0 is the identity element.
pub fn disk_offsets(radius: usize) -> Vec<(i64, i64)> {
    let r = radius as i64;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r2 {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// Dilate a mask by a disk of the given pixel radius.
///
/// A pixel is set in the output when any set pixel lies within the disk.
/// Absent pixels act as unset neighbors rather than poisoning the
/// neighborhood, so a sparse mask grows outward cleanly. Output pixels
/// are 1.0 or absent.
pub fn dilate_mask(mask: &Mask, radius: usize) -> Result<Mask> {
    let (rows, cols) = mask.shape();
    let offsets = disk_offsets(radius);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                for &(dr, dc) in &offsets {
                    let nr = row as i64 + dr;
                    let nc = col as i64 + dc;
                    if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
                        continue;
                    }
                    if mask.is_set(nr as usize, nc as usize) {
                        row_data[col] = 1.0;
                        break;
                    }
                }
            }
            row_data
        })
        .collect();

    let mut output = mask.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wastelens_core::raster::Raster;

    fn point_mask(rows: usize, cols: usize, row: usize, col: usize) -> Mask {
        let mut m: Mask = Raster::filled(rows, cols, f64::NAN);
        m.set(row, col, 1.0).unwrap();
        m
    }

    #[test]
    fn test_disk_radius_one_is_plus_shape() {
        let offsets = disk_offsets(1);
        assert_eq!(offsets.len(), 5);
        assert!(offsets.contains(&(0, 0)));
        assert!(offsets.contains(&(-1, 0)));
        assert!(!offsets.contains(&(-1, -1)));
    }

    #[test]
    fn test_dilate_grows_point() {
        let m = point_mask(7, 7, 3, 3);
        let out = dilate_mask(&m, 2).unwrap();

        assert!(out.is_set(3, 3));
        assert!(out.is_set(1, 3)); // distance 2, inside the disk
        assert!(out.is_set(2, 2)); // distance sqrt(2)
        assert!(!out.is_set(1, 1)); // distance 2*sqrt(2), outside
        assert!(!out.is_set(0, 3)); // distance 3
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let m = point_mask(5, 5, 2, 2);
        let out = dilate_mask(&m, 0).unwrap();
        assert_eq!(out.set_count(), 1);
        assert!(out.is_set(2, 2));
    }

    #[test]
    fn test_dilate_stays_inside_grid() {
        let m = point_mask(3, 3, 0, 0);
        let out = dilate_mask(&m, 5).unwrap();
        assert_eq!(out.set_count(), 9);
    }
}
