//! # WasteLens Algorithms
//!
//! Analysis algorithms for the WasteLens change-detection pipeline.
//!
//! ## Categories
//!
//! - **composite**: monthly and period median compositing
//! - **imagery**: spectral indices
//! - **change**: quantile thresholds, the debris predicate, component filtering
//! - **morphology**: mask dilation
//! - **masks**: water mask and the proximity combiner
//! - **vectorize**: mask-to-polygon tracing with site measurements
//! - **pipeline**: end-to-end orchestration

pub mod change;
pub mod composite;
pub mod imagery;
pub mod masks;
pub mod morphology;
pub mod pipeline;
pub mod vectorize;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{
        detect_change, filter_components, region_quantiles, ChangeDetection, ChangeParams,
        FallbackThresholds, QuantileParams, ResolvedThresholds,
    };
    pub use crate::composite::{
        median_stack, monthly_optical_composite, monthly_radar_composite, period_stack,
        MonthlyParams,
    };
    pub use crate::imagery::{append_indices, ndbi, ndvi, ndwi, normalized_difference};
    pub use crate::masks::{water_mask, water_near_change, ProximityParams, WaterMaskParams};
    pub use crate::morphology::dilate_mask;
    pub use crate::pipeline::{run, PipelineParams, PipelineRun};
    pub use crate::vectorize::{to_geographic, vectorize_mask, VectorizeParams};
    pub use wastelens_core::prelude::*;
}
