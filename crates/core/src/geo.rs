//! Geographic extent and time window types
//!
//! An [`AreaOfInterest`] is a lon/lat rectangle with an optional protective
//! buffer. Analysis happens on a local metric grid derived from the AOI via
//! an equirectangular approximation at the AOI's center latitude; this is
//! accurate to well under a percent at the few-kilometre extents the
//! pipeline targets.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Metres per degree of latitude (spherical approximation)
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// A rectangular area of interest in geographic (lon/lat) coordinates.
///
/// Stored extents include any buffer applied at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl AreaOfInterest {
    /// Build an AOI from two corner points, expanded outward by `buffer_m`
    /// metres on every side.
    ///
    /// Corner order does not matter. Degenerate rectangles (zero width or
    /// height before buffering) are rejected, as are coordinates outside
    /// the valid lon/lat range.
    pub fn from_rect(lon1: f64, lat1: f64, lon2: f64, lat2: f64, buffer_m: f64) -> Result<Self> {
        for &v in &[lon1, lat1, lon2, lat2, buffer_m] {
            if !v.is_finite() {
                return Err(Error::InvalidAoi("non-finite coordinate".into()));
            }
        }
        if buffer_m < 0.0 {
            return Err(Error::InvalidAoi(format!("negative buffer: {buffer_m} m")));
        }

        let (min_lon, max_lon) = if lon1 <= lon2 { (lon1, lon2) } else { (lon2, lon1) };
        let (min_lat, max_lat) = if lat1 <= lat2 { (lat1, lat2) } else { (lat2, lat1) };

        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(Error::InvalidAoi(format!(
                "longitude out of range: {min_lon}..{max_lon}"
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(Error::InvalidAoi(format!(
                "latitude out of range: {min_lat}..{max_lat}"
            )));
        }
        if min_lon == max_lon || min_lat == max_lat {
            return Err(Error::InvalidAoi("degenerate rectangle".into()));
        }

        let lat_c = (min_lat + max_lat) / 2.0;
        let m_per_deg_lon = METERS_PER_DEG_LAT * lat_c.to_radians().cos();
        if m_per_deg_lon < 1.0 {
            return Err(Error::InvalidAoi("AOI too close to a pole".into()));
        }

        let dlat = buffer_m / METERS_PER_DEG_LAT;
        let dlon = buffer_m / m_per_deg_lon;

        Ok(Self {
            min_lon: (min_lon - dlon).max(-180.0),
            min_lat: (min_lat - dlat).max(-90.0),
            max_lon: (max_lon + dlon).min(180.0),
            max_lat: (max_lat + dlat).min(90.0),
        })
    }

    /// Center of the AOI as (lon, lat)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Metres per degree of longitude at the AOI's center latitude
    pub fn meters_per_deg_lon(&self) -> f64 {
        let (_, lat_c) = self.center();
        METERS_PER_DEG_LAT * lat_c.to_radians().cos()
    }

    /// AOI width and height in metres
    pub fn extent_m(&self) -> (f64, f64) {
        let width = (self.max_lon - self.min_lon) * self.meters_per_deg_lon();
        let height = (self.max_lat - self.min_lat) * METERS_PER_DEG_LAT;
        (width, height)
    }

    /// Lay a local metric grid over the AOI at the given cell size.
    ///
    /// Grid coordinates are metres east/north of the AOI's lower-left
    /// corner, with the raster origin at the upper-left as usual. Returns
    /// the transform and the (rows, cols) needed to cover the AOI.
    pub fn grid(&self, cell_m: f64) -> Result<(GeoTransform, usize, usize)> {
        if !(cell_m.is_finite() && cell_m > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell_m",
                value: format!("{cell_m}"),
                reason: "cell size must be positive".into(),
            });
        }
        let (width_m, height_m) = self.extent_m();
        let cols = (width_m / cell_m).ceil().max(1.0) as usize;
        let rows = (height_m / cell_m).ceil().max(1.0) as usize;
        let transform = GeoTransform::new(0.0, rows as f64 * cell_m, cell_m, -cell_m);
        Ok((transform, rows, cols))
    }

    /// Convert local grid coordinates (metres east/north of the lower-left
    /// corner) back to (lon, lat)
    pub fn to_lonlat(&self, x_m: f64, y_m: f64) -> (f64, f64) {
        (
            self.min_lon + x_m / self.meters_per_deg_lon(),
            self.min_lat + y_m / METERS_PER_DEG_LAT,
        )
    }
}

/// A half-open observation window [start, end) over whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Create a window, requiring start strictly before end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidDateWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of whole months in the window: the largest n for which
    /// `start + n months` still lies at or before `end`.
    ///
    /// A trailing partial month is not counted, so every month slot fits
    /// inside the half-open window: 2023-01-15 .. 2023-04-02 spans two
    /// whole months, not three.
    pub fn month_count(&self) -> u32 {
        let years = self.end.year() - self.start.year();
        let months = years * 12 + self.end.month() as i32 - self.start.month() as i32;
        if months <= 0 {
            return 0;
        }
        // the calendar-month difference overshoots by at most one slot
        let mut n = months as u32;
        if self.start + Months::new(n) > self.end {
            n -= 1;
        }
        n
    }

    /// Dates marking the start of each month slot in the window: the start
    /// date itself advanced by 0, 1, .. month_count-1 months.
    ///
    /// Fails with [`Error::EmptyWindow`] when the window spans no whole
    /// month; a window that thin cannot produce a composite.
    pub fn month_starts(&self) -> Result<Vec<NaiveDate>> {
        let n = self.month_count();
        if n == 0 {
            return Err(Error::EmptyWindow {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok((0..n)
            .map(|k| self.start + Months::new(k))
            .collect())
    }

    /// Whether a date falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// The [start, end) span of a single month slot beginning at `month_start`
pub fn month_span(month_start: NaiveDate) -> (NaiveDate, NaiveDate) {
    (month_start, month_start + Months::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_aoi_buffer_expands_extent() {
        let raw = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        let buffered = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 2000.0).unwrap();

        let (w0, h0) = raw.extent_m();
        let (w1, h1) = buffered.extent_m();
        assert_relative_eq!(h1 - h0, 4000.0, epsilon = 1.0);
        assert_relative_eq!(w1 - w0, 4000.0, epsilon = 1.0);
    }

    #[test]
    fn test_aoi_corner_order_irrelevant() {
        let a = AreaOfInterest::from_rect(30.6, 50.5, 30.5, 50.4, 0.0).unwrap();
        let b = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_aoi_rejects_degenerate_and_out_of_range() {
        assert!(AreaOfInterest::from_rect(30.5, 50.4, 30.5, 50.5, 0.0).is_err());
        assert!(AreaOfInterest::from_rect(200.0, 50.4, 30.6, 50.5, 0.0).is_err());
        assert!(AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, -1.0).is_err());
    }

    #[test]
    fn test_grid_covers_aoi() {
        let aoi = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        let (transform, rows, cols) = aoi.grid(10.0).unwrap();

        let (width_m, height_m) = aoi.extent_m();
        assert!(rows as f64 * 10.0 >= height_m);
        assert!(cols as f64 * 10.0 >= width_m);
        assert_relative_eq!(transform.cell_size(), 10.0);
        assert!(transform.pixel_height < 0.0);
    }

    #[test]
    fn test_to_lonlat_inverts_grid() {
        let aoi = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        let (lon, lat) = aoi.to_lonlat(0.0, 0.0);
        assert_relative_eq!(lon, aoi.min_lon, epsilon = 1e-9);
        assert_relative_eq!(lat, aoi.min_lat, epsilon = 1e-9);

        let (width_m, height_m) = aoi.extent_m();
        let (lon, lat) = aoi.to_lonlat(width_m, height_m);
        assert_relative_eq!(lon, aoi.max_lon, epsilon = 1e-9);
        assert_relative_eq!(lat, aoi.max_lat, epsilon = 1e-9);
    }

    #[test]
    fn test_month_count_drops_trailing_partial_month() {
        let misaligned = DateWindow::new(date(2023, 1, 15), date(2023, 4, 2)).unwrap();
        assert_eq!(misaligned.month_count(), 2);

        let aligned = DateWindow::new(date(2023, 1, 15), date(2023, 4, 15)).unwrap();
        assert_eq!(aligned.month_count(), 3);

        // not a single whole month
        let thin = DateWindow::new(date(2023, 1, 25), date(2023, 2, 20)).unwrap();
        assert_eq!(thin.month_count(), 0);
    }

    #[test]
    fn test_month_slots_stay_inside_window() {
        let w = DateWindow::new(date(2023, 1, 15), date(2023, 4, 2)).unwrap();
        let starts = w.month_starts().unwrap();
        assert_eq!(starts, vec![date(2023, 1, 15), date(2023, 2, 15)]);
        for start in starts {
            let (_, slot_end) = month_span(start);
            assert!(slot_end <= w.end());
        }
    }

    #[test]
    fn test_month_starts_advance_from_start_date() {
        let w = DateWindow::new(date(2023, 1, 31), date(2023, 5, 1)).unwrap();
        let starts = w.month_starts().unwrap();
        // chrono clamps to the last valid day of shorter months
        assert_eq!(
            starts,
            vec![date(2023, 1, 31), date(2023, 2, 28), date(2023, 3, 31)]
        );
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let w = DateWindow::new(date(2023, 1, 5), date(2023, 1, 20)).unwrap();
        assert!(matches!(
            w.month_starts(),
            Err(Error::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_window_order_enforced() {
        assert!(DateWindow::new(date(2023, 2, 1), date(2023, 1, 1)).is_err());
    }
}
