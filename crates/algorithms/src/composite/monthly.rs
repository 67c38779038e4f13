//! Monthly scene compositing

use ndarray::Array2;
use tracing::debug;

use crate::composite::median_stack;
use crate::imagery::append_indices;
use crate::maybe_rayon::*;
use wastelens_core::raster::{Band, BandStack, GeoTransform, Raster};
use wastelens_core::scene::{OpticalScene, RadarScene, SCL_KEEP_LOOSE_EXTRA, SCL_KEEP_STRICT};
use wastelens_core::Result;

/// Parameters for monthly compositing
#[derive(Debug, Clone)]
pub struct MonthlyParams {
    /// Maximum scene-level cloudy pixel percentage admitted
    pub max_cloud: f64,
    /// Loosen the SCL quality screen, additionally admitting cloud shadow
    /// and medium-probability cloud pixels
    pub loosen: bool,
}

impl Default for MonthlyParams {
    fn default() -> Self {
        Self {
            max_cloud: 60.0,
            loosen: false,
        }
    }
}

const OPTICAL_BANDS: [Band; 5] = [Band::B2, Band::B3, Band::B4, Band::B8, Band::B11];

/// Composite one month of optical scenes into a median stack with derived
/// indices.
///
/// Scenes above the cloud threshold are discarded; surviving pixels are
/// screened by their SCL class before the median. The screen is strict
/// unless the caller opts into the loosened class set. A month where the
/// screen leaves nothing composites to all-NaN on the target grid and is
/// never rescued by silently changing the screen.
pub fn monthly_optical_composite(
    scenes: &[OpticalScene],
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    params: &MonthlyParams,
) -> Result<BandStack> {
    let admitted: Vec<&OpticalScene> = scenes
        .iter()
        .filter(|s| s.cloud_cover <= params.max_cloud)
        .collect();

    let mut stack = composite_screened(&admitted, transform, rows, cols, params.loosen)?;
    if !stack_has_valid_pixels(&stack) {
        debug!(
            scenes = admitted.len(),
            loosen = params.loosen,
            "quality screen left no pixels, month is all-NaN"
        );
    }

    append_indices(&mut stack)?;
    Ok(stack)
}

fn composite_screened(
    scenes: &[&OpticalScene],
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    loosen: bool,
) -> Result<BandStack> {
    if scenes.is_empty() {
        return empty_optical_stack(transform, rows, cols);
    }

    let mut stack = BandStack::new();
    for band in OPTICAL_BANDS {
        let screened: Vec<Raster<f64>> = scenes
            .iter()
            .map(|scene| screen_band(scene, band, loosen))
            .collect::<Result<_>>()?;
        let refs: Vec<&Raster<f64>> = screened.iter().collect();
        let mut median = median_stack(&refs)?;
        median.set_transform(transform);
        stack.insert(band, median)?;
    }
    Ok(stack)
}

/// Copy one band of a scene with quality-rejected pixels set to NaN
fn screen_band(scene: &OpticalScene, band: Band, loosen: bool) -> Result<Raster<f64>> {
    let source = scene.bands.band(band)?;
    let (rows, cols) = source.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let class = unsafe { scene.scl.get_unchecked(row, col) };
                if scl_admitted(class, loosen) {
                    row_data[col] = unsafe { source.get_unchecked(row, col) };
                }
            }
            row_data
        })
        .collect();

    let mut output = source.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| wastelens_core::Error::Other(e.to_string()))?;
    Ok(output)
}

fn scl_admitted(class: u8, loosen: bool) -> bool {
    SCL_KEEP_STRICT.contains(&class) || (loosen && SCL_KEEP_LOOSE_EXTRA.contains(&class))
}

fn stack_has_valid_pixels(stack: &BandStack) -> bool {
    stack.iter().any(|(_, r)| r.valid_count() > 0)
}

fn empty_optical_stack(transform: GeoTransform, rows: usize, cols: usize) -> Result<BandStack> {
    let mut stack = BandStack::new();
    for band in OPTICAL_BANDS {
        let mut r = Raster::filled(rows, cols, f64::NAN);
        r.set_transform(transform);
        r.set_nodata(Some(f64::NAN));
        stack.insert(band, r)?;
    }
    Ok(stack)
}

/// Convert linear backscatter power to decibels. Non-positive and absent
/// values become NaN.
pub fn to_db(linear: &Raster<f64>) -> Raster<f64> {
    let mut out = linear.clone();
    out.data_mut()
        .mapv_inplace(|v| if v > 0.0 { 10.0 * v.log10() } else { f64::NAN });
    out.set_nodata(Some(f64::NAN));
    out
}

/// Composite one month of radar scenes into median VV/VH backscatter in dB.
///
/// A month with no scenes composites to all-NaN on the target grid.
pub fn monthly_radar_composite(
    scenes: &[RadarScene],
    transform: GeoTransform,
    rows: usize,
    cols: usize,
) -> Result<BandStack> {
    let composite_pol = |layers: Vec<Raster<f64>>| -> Result<Raster<f64>> {
        if layers.is_empty() {
            let mut r = Raster::filled(rows, cols, f64::NAN);
            r.set_transform(transform);
            r.set_nodata(Some(f64::NAN));
            return Ok(r);
        }
        let refs: Vec<&Raster<f64>> = layers.iter().collect();
        let mut median = median_stack(&refs)?;
        median.set_transform(transform);
        Ok(median)
    };

    let vv = composite_pol(scenes.iter().map(|s| to_db(&s.vv)).collect())?;
    let vh = composite_pol(scenes.iter().map(|s| to_db(&s.vh)).collect())?;

    let mut stack = BandStack::new();
    stack.insert(Band::Vv, vv)?;
    stack.insert(Band::Vh, vh)?;
    Ok(stack)
}
