//! Period stacks: the median of a window's monthly composites

use tracing::debug;

use crate::composite::{
    median_stack, monthly_optical_composite, monthly_radar_composite, MonthlyParams,
};
use wastelens_core::geo::month_span;
use wastelens_core::raster::{BandStack, GeoTransform, Raster, ANALYSIS_BANDS};
use wastelens_core::scene::{OpticalScene, RadarScene};
use wastelens_core::{DateWindow, Result};

/// Reduce a window of scenes to a single period stack.
///
/// Each whole month in the window is composited independently (optical
/// screening and radar dB conversion happen per month), and the monthly
/// stacks are reduced band-by-band with the same NaN-ignoring median.
/// Months with no usable data contribute nothing. The result carries
/// exactly the analysis bands; a band no month observed is all-NaN.
///
/// Fails only on an empty window (no whole month between start and end).
pub fn period_stack(
    optical: &[OpticalScene],
    radar: &[RadarScene],
    window: &DateWindow,
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    params: &MonthlyParams,
) -> Result<BandStack> {
    let month_starts = window.month_starts()?;
    debug!(months = month_starts.len(), "compositing period");

    let mut monthly: Vec<BandStack> = Vec::with_capacity(month_starts.len());
    for month_start in month_starts {
        let (begin, end) = month_span(month_start);

        let month_optical: Vec<OpticalScene> = optical
            .iter()
            .filter(|s| s.date >= begin && s.date < end)
            .cloned()
            .collect();
        let month_radar: Vec<RadarScene> = radar
            .iter()
            .filter(|s| s.date >= begin && s.date < end)
            .cloned()
            .collect();

        let mut stack =
            monthly_optical_composite(&month_optical, transform, rows, cols, params)?;
        stack.merge(monthly_radar_composite(&month_radar, transform, rows, cols)?)?;
        monthly.push(stack);
    }

    let mut period = BandStack::new();
    for band in ANALYSIS_BANDS {
        let layers: Vec<&Raster<f64>> = monthly
            .iter()
            .filter_map(|stack| stack.get(band))
            .collect();
        let reduced = if layers.is_empty() {
            let mut r = Raster::filled(rows, cols, f64::NAN);
            r.set_transform(transform);
            r.set_nodata(Some(f64::NAN));
            r
        } else {
            let mut m = median_stack(&layers)?;
            m.set_transform(transform);
            m
        };
        period.insert(band, reduced)?;
    }
    Ok(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use wastelens_core::raster::Band;
    use wastelens_core::scene::scl;
    use wastelens_core::Error;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grid() -> GeoTransform {
        GeoTransform::new(0.0, 20.0, 10.0, -10.0)
    }

    fn optical(day: NaiveDate, value: f64) -> OpticalScene {
        let mut bands = BandStack::new();
        for band in [Band::B2, Band::B3, Band::B4, Band::B8, Band::B11] {
            let mut r = Raster::filled(2, 2, value);
            r.set_transform(grid());
            bands.insert(band, r).unwrap();
        }
        OpticalScene {
            date: day,
            cloud_cover: 5.0,
            bands,
            scl: Raster::filled(2, 2, scl::NOT_VEGETATED),
        }
    }

    fn radar(day: NaiveDate, linear: f64) -> RadarScene {
        let mut r = Raster::filled(2, 2, linear);
        r.set_transform(grid());
        RadarScene {
            date: day,
            vv: r.clone(),
            vh: r,
        }
    }

    #[test]
    fn test_period_median_over_months() {
        let window = DateWindow::new(date(2023, 1, 1), date(2023, 4, 1)).unwrap();
        let optical = vec![
            optical(date(2023, 1, 10), 0.1),
            optical(date(2023, 2, 10), 0.2),
            optical(date(2023, 3, 10), 0.6),
        ];
        let radar = vec![radar(date(2023, 1, 15), 0.1)];

        let stack =
            period_stack(&optical, &radar, &window, grid(), 2, 2, &MonthlyParams::default())
                .unwrap();

        assert_relative_eq!(stack.band(Band::B4).unwrap().get(0, 0).unwrap(), 0.2);
        // radar observed in one month only, the median passes it through
        assert_relative_eq!(stack.band(Band::Vv).unwrap().get(0, 0).unwrap(), -10.0);
        let mut expected = ANALYSIS_BANDS.to_vec();
        expected.sort();
        assert_eq!(stack.band_keys(), expected);
    }

    #[test]
    fn test_scene_outside_window_ignored() {
        let window = DateWindow::new(date(2023, 1, 1), date(2023, 2, 1)).unwrap();
        let optical = vec![
            optical(date(2023, 1, 10), 0.1),
            optical(date(2023, 5, 10), 0.9),
        ];

        let stack =
            period_stack(&optical, &[], &window, grid(), 2, 2, &MonthlyParams::default()).unwrap();
        assert_relative_eq!(stack.band(Band::B4).unwrap().get(0, 0).unwrap(), 0.1);
    }

    #[test]
    fn test_trailing_partial_month_excluded() {
        // two whole months: [01-15, 02-15) and [02-15, 03-15)
        let window = DateWindow::new(date(2023, 1, 15), date(2023, 4, 2)).unwrap();
        let optical = vec![
            optical(date(2023, 1, 20), 0.1),
            // past the window end; a third slot would have swallowed it
            optical(date(2023, 4, 10), 0.5),
        ];

        let stack =
            period_stack(&optical, &[], &window, grid(), 2, 2, &MonthlyParams::default()).unwrap();
        assert_relative_eq!(stack.band(Band::B4).unwrap().get(0, 0).unwrap(), 0.1);
    }

    #[test]
    fn test_no_scenes_yields_all_nan_stack() {
        let window = DateWindow::new(date(2023, 1, 1), date(2023, 3, 1)).unwrap();
        let stack =
            period_stack(&[], &[], &window, grid(), 2, 2, &MonthlyParams::default()).unwrap();
        for band in ANALYSIS_BANDS {
            assert_eq!(stack.band(band).unwrap().valid_count(), 0);
        }
    }

    #[test]
    fn test_empty_window_fails_fast() {
        let window = DateWindow::new(date(2023, 1, 5), date(2023, 1, 25)).unwrap();
        let result = period_stack(&[], &[], &window, grid(), 2, 2, &MonthlyParams::default());
        assert!(matches!(result, Err(Error::EmptyWindow { .. })));
    }
}
