//! End-to-end detection pipeline
//!
//! Composites the pre and post windows, then runs the two analysis
//! branches. Change detection and water masking are independent: a failure
//! in one is recorded and the other still produces output. The proximity
//! product needs both, so it exists only when both branches succeed.

use tracing::{info, warn};

use crate::change::{detect_change, ChangeDetection, ChangeParams};
use crate::composite::{period_stack, MonthlyParams};
use crate::masks::{water_mask, water_near_change, ProximityParams, WaterMaskParams};
use crate::vectorize::{to_geographic, vectorize_mask, VectorizeParams};
use wastelens_core::raster::{BandStack, Mask};
use wastelens_core::scene::{OpticalScene, RadarScene};
use wastelens_core::vector::FeatureCollection;
use wastelens_core::{AreaOfInterest, DateWindow, Result};

/// Parameters for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Analysis cell size in metres
    pub cell_m: f64,
    pub monthly: MonthlyParams,
    pub change: ChangeParams,
    pub water: WaterMaskParams,
    pub proximity: ProximityParams,
    pub vectorize: VectorizeParams,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            cell_m: 10.0,
            monthly: MonthlyParams::default(),
            change: ChangeParams::default(),
            water: WaterMaskParams::default(),
            proximity: ProximityParams::default(),
            vectorize: VectorizeParams::default(),
        }
    }
}

/// Everything a pipeline run produced.
///
/// Branch products are optional: a recorded issue explains each absence.
#[derive(Debug)]
pub struct PipelineRun {
    pub pre: BandStack,
    pub post: BandStack,
    pub change: Option<ChangeDetection>,
    pub water: Option<Mask>,
    pub water_near_change: Option<Mask>,
    /// Detected sites in geographic coordinates
    pub sites: FeatureCollection,
    /// Branch failures, in the order they occurred
    pub issues: Vec<String>,
}

/// Run the full pipeline over one AOI and a pre/post window pair.
///
/// Fails outright only on structural problems (bad grid, empty window);
/// data sparsity flows through as absent pixels and empty collections.
pub fn run(
    aoi: &AreaOfInterest,
    optical: &[OpticalScene],
    radar: &[RadarScene],
    pre_window: &DateWindow,
    post_window: &DateWindow,
    params: &PipelineParams,
) -> Result<PipelineRun> {
    let (transform, rows, cols) = aoi.grid(params.cell_m)?;
    info!(rows, cols, cell_m = params.cell_m, "pipeline grid ready");

    let pre = period_stack(optical, radar, pre_window, transform, rows, cols, &params.monthly)?;
    let post = period_stack(optical, radar, post_window, transform, rows, cols, &params.monthly)?;

    let mut issues = Vec::new();

    let change = match detect_change(&pre, &post, &params.change) {
        Ok(detection) => {
            info!(pixels = detection.mask.set_count(), "change mask ready");
            Some(detection)
        }
        Err(e) => {
            warn!(error = %e, "change detection failed");
            issues.push(format!("change detection: {e}"));
            None
        }
    };

    let water = match water_mask(&post, &params.water) {
        Ok(mask) => {
            info!(pixels = mask.set_count(), "water mask ready");
            Some(mask)
        }
        Err(e) => {
            warn!(error = %e, "water masking failed");
            issues.push(format!("water mask: {e}"));
            None
        }
    };

    let water_near = match (&change, &water) {
        (Some(detection), Some(water)) => {
            match water_near_change(&detection.mask, water, &params.proximity) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    warn!(error = %e, "proximity combination failed");
                    issues.push(format!("water near change: {e}"));
                    None
                }
            }
        }
        _ => None,
    };

    let sites = match &change {
        Some(detection) => {
            let metric = vectorize_mask(&detection.mask, &params.vectorize)?;
            to_geographic(&metric, aoi)?
        }
        None => FeatureCollection::new(),
    };
    info!(sites = sites.len(), issues = issues.len(), "pipeline finished");

    Ok(PipelineRun {
        pre,
        post,
        change,
        water,
        water_near_change: water_near,
        sites,
        issues,
    })
}
