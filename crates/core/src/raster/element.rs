//! Cell value types for [`Raster`](super::Raster)

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// The cell types the pipeline stores in rasters.
///
/// Reflectance, indices and masks are `f64` with NaN as the absent value;
/// the SCL quality band is `u8`; component labels are `i32`; `f32` covers
/// the sample format GeoTIFFs use on disk.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// The no-data value used when none is configured
    fn default_nodata() -> Self;

    /// Whether this value counts as no-data under the given sentinel
    fn is_nodata(&self, nodata: Option<Self>) -> bool;
}

// NaN is always absent for floats, whatever the configured sentinel.
macro_rules! impl_float_element {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan()
                    || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }
        }
    };
}

impl_float_element!(f32);
impl_float_element!(f64);

impl RasterElement for u8 {
    // 0 is the SCL no-data class
    fn default_nodata() -> Self {
        0
    }

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        nodata == Some(*self)
    }
}

impl RasterElement for i32 {
    fn default_nodata() -> Self {
        i32::MIN
    }

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        nodata == Some(*self)
    }
}
