//! WasteLens CLI - dumping and landfill-growth detection from satellite imagery

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wastelens_algorithms::change::QuantileParams;
use wastelens_algorithms::masks::{ProximityParams, WaterMaskParams};
use wastelens_algorithms::pipeline::{run, PipelineParams};
use wastelens_catalog::stac::{optical_search, radar_search, StacClientOptions};
use wastelens_catalog::sync_api::{export_geojson_blocking, StacClientBlocking};
use wastelens_catalog::{LocalSceneStore, SceneSource};
use wastelens_core::io::{read_geotiff, write_geotiff};
use wastelens_core::{AreaOfInterest, DateWindow, Mask, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "wastelens")]
#[command(author, version, about = "Detect dumping and landfill growth from satellite imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run change detection over an AOI and a pre/post window pair
    Detect {
        /// Scene manifest file (JSON, band paths relative to it)
        #[arg(long)]
        manifest: PathBuf,

        /// AOI corners as "lon1,lat1,lon2,lat2"
        #[arg(long)]
        aoi: String,

        /// Protective buffer around the AOI, metres
        #[arg(long, default_value = "2000")]
        aoi_buffer: f64,

        /// Pre (baseline) window as "YYYY-MM-DD/YYYY-MM-DD"
        #[arg(long)]
        pre: String,

        /// Post (observation) window as "YYYY-MM-DD/YYYY-MM-DD"
        #[arg(long)]
        post: String,

        /// Lower quantile percentile for thresholds
        #[arg(long, default_value = "35")]
        qlow: f64,

        /// Upper quantile percentile for thresholds
        #[arg(long, default_value = "65")]
        qhigh: f64,

        /// NDWI threshold for the water mask
        #[arg(long, default_value = "0.20")]
        ndwi_threshold: f64,

        /// Water proximity buffer, metres
        #[arg(long, default_value = "50")]
        near_buffer: f64,

        /// Minimum connected-component size in pixels
        #[arg(long, default_value = "15")]
        min_component: usize,

        /// Maximum scene cloud cover admitted, percent
        #[arg(long, default_value = "60")]
        max_cloud: f64,

        /// Loosen the scene quality screen (admit cloud shadow and
        /// medium-probability cloud pixels)
        #[arg(long)]
        loosen: bool,

        /// Analysis cell size, metres
        #[arg(long, default_value = "10")]
        cell: f64,

        /// Output directory for masks and the sites file
        #[arg(short, long, default_value = "wastelens-out")]
        out_dir: PathBuf,
    },

    /// Search a STAC catalog for scenes covering an AOI and window
    Search {
        /// STAC API root URL
        #[arg(long)]
        endpoint: String,

        /// AOI corners as "lon1,lat1,lon2,lat2"
        #[arg(long)]
        aoi: String,

        /// Window as "YYYY-MM-DD/YYYY-MM-DD"
        #[arg(long)]
        window: String,

        /// Also list radar scenes
        #[arg(long)]
        radar: bool,

        /// Maximum scene cloud cover to list, percent
        #[arg(long, default_value = "60")]
        max_cloud: f64,
    },

    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_aoi(spec: &str, buffer_m: f64) -> Result<AreaOfInterest> {
    let parts: Vec<f64> = spec
        .split(',')
        .map(|p| p.trim().parse().context("AOI coordinates must be numbers"))
        .collect::<Result<_>>()?;
    if parts.len() != 4 {
        bail!("AOI must be 'lon1,lat1,lon2,lat2', got: {spec}");
    }
    AreaOfInterest::from_rect(parts[0], parts[1], parts[2], parts[3], buffer_m)
        .context("invalid AOI")
}

fn parse_window(spec: &str) -> Result<DateWindow> {
    let (start, end) = spec
        .split_once('/')
        .with_context(|| format!("window must be 'start/end', got: {spec}"))?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").context("invalid start date")?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").context("invalid end date")?;
    DateWindow::new(start, end).context("invalid window")
}

fn check_range(name: &str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if !(lo..=hi).contains(&value) {
        bail!("{name} must be between {lo} and {hi}, got {value}");
    }
    Ok(())
}

fn write_mask(mask: &Mask, path: &Path) -> Result<()> {
    write_geotiff(mask, path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Detect {
            manifest,
            aoi,
            aoi_buffer,
            pre,
            post,
            qlow,
            qhigh,
            ndwi_threshold,
            near_buffer,
            min_component,
            max_cloud,
            loosen,
            cell,
            out_dir,
        } => {
            check_range("qlow", qlow, 10.0, 49.0)?;
            check_range("qhigh", qhigh, 51.0, 90.0)?;
            check_range("ndwi-threshold", ndwi_threshold, 0.0, 0.5)?;
            check_range("near-buffer", near_buffer, 10.0, 200.0)?;
            check_range("max-cloud", max_cloud, 0.0, 100.0)?;

            let aoi = parse_aoi(&aoi, aoi_buffer)?;
            let pre_window = parse_window(&pre)?;
            let post_window = parse_window(&post)?;

            let start = Instant::now();
            let pb = spinner("Loading scenes...");
            let store = LocalSceneStore::open(&manifest).context("failed to open manifest")?;
            let full_span = DateWindow::new(
                pre_window.start().min(post_window.start()),
                pre_window.end().max(post_window.end()),
            )?;
            let optical = store.optical_scenes(&aoi, &full_span, max_cloud)?;
            let radar = store.radar_scenes(&aoi, &full_span)?;
            pb.finish_and_clear();
            info!("{} optical and {} radar scenes loaded", optical.len(), radar.len());

            let mut params = PipelineParams::default();
            params.cell_m = cell;
            params.monthly.max_cloud = max_cloud;
            params.monthly.loosen = loosen;
            params.change.quantiles = QuantileParams {
                qlow,
                qhigh,
                ..QuantileParams::default()
            };
            params.change.min_component = min_component;
            params.water = WaterMaskParams { ndwi_threshold };
            params.proximity = ProximityParams {
                buffer_m: near_buffer,
            };

            let pb = spinner("Running pipeline...");
            let result = run(&aoi, &optical, &radar, &pre_window, &post_window, &params)?;
            pb.finish_and_clear();

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("cannot create {}", out_dir.display()))?;

            if let Some(detection) = &result.change {
                write_mask(&detection.mask, &out_dir.join("change.tif"))?;
            }
            if let Some(water) = &result.water {
                write_mask(water, &out_dir.join("water.tif"))?;
            }
            if let Some(near) = &result.water_near_change {
                write_mask(near, &out_dir.join("water_near_change.tif"))?;
            }
            let sites_path = out_dir.join("sites.geojson");
            export_geojson_blocking(&result.sites, &sites_path)
                .context("failed to export sites")?;

            for issue in &result.issues {
                eprintln!("warning: {issue}");
            }
            println!("Detected sites: {}", result.sites.len());
            println!("Outputs in: {}", out_dir.display());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Search {
            endpoint,
            aoi,
            window,
            radar,
            max_cloud,
        } => {
            let aoi = parse_aoi(&aoi, 0.0)?;
            let window = parse_window(&window)?;
            let client = StacClientBlocking::new(&endpoint, StacClientOptions::default())
                .context("failed to create STAC client")?;

            let params = if radar {
                radar_search(&aoi, &window)
            } else {
                optical_search(&aoi, &window)
            };
            let pb = spinner("Searching catalog...");
            let items = client.search_all(&params).context("STAC search failed")?;
            pb.finish_and_clear();

            let mut listed = 0usize;
            for item in &items {
                if radar {
                    if !item.has_dual_polarization() {
                        continue;
                    }
                } else if item.cloud_cover().map(|c| c > max_cloud).unwrap_or(false) {
                    continue;
                }
                listed += 1;
                let date = item
                    .acquisition_date()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "????-??-??".into());
                match item.cloud_cover() {
                    Some(cloud) => println!("{date}  {:>5.1}% cloud  {}", cloud, item.id),
                    None => println!("{date}  {}", item.id),
                }
            }
            println!("{listed} of {} scenes usable", items.len());
        }

        Commands::Info { input } => {
            let raster: Raster<f64> = read_geotiff(&input).context("failed to read raster")?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();

            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            let mut valid = 0usize;
            for &v in raster.data().iter() {
                if !raster.is_nodata(v) {
                    min = min.min(v);
                    max = max.max(v);
                    sum += v;
                    valid += 1;
                }
            }

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if valid > 0 {
                println!("Min: {min:.4}  Max: {max:.4}  Mean: {:.4}", sum / valid as f64);
            }
            println!(
                "Valid cells: {} ({:.1}%)",
                valid,
                100.0 * valid as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}
