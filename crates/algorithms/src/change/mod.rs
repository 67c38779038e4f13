//! Pre/post change detection

mod components;
mod detect;
mod quantiles;

pub use components::{filter_components, label_components};
pub use detect::{
    detect_change, resolve_thresholds, ChangeDetection, ChangeParams, FallbackThresholds,
    ResolvedThresholds,
};
pub use quantiles::{region_quantiles, QuantilePair, QuantileParams};
