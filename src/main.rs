// src/main.rs
use anyhow::{bail, Context, Result};
use route_map_annotator::output::{is_usable_map_image, timestamped_output_path};
use route_map_annotator::static_map::{StaticMapClient, StaticMapRequest};
use route_map_annotator::{
    plan_viewport, produce_annotated_map_to, MapRequest, RenderConfig, StaticMapConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A render job on disk: the trip plus where the base map comes from and where the result goes.
#[derive(Debug, Deserialize)]
struct MapJob {
    #[serde(flatten)]
    request: MapRequest,
    /// Pre-rendered base map; fetched from the static-map service when absent.
    #[serde(default)]
    base_image: Option<PathBuf>,
    #[serde(default)]
    output: Option<PathBuf>,
}

fn load_job(path: &Path) -> Result<MapJob> {
    let raw = fs::read_to_string(path).with_context(|| format!("read job file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse job file {}", path.display()))
}

fn job_path() -> Result<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MAP_JOB_FILE").ok())
        .map(PathBuf::from)
        .context("usage: route-map-annotator <job.json> (or set MAP_JOB_FILE)")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let job_file = job_path()?;
    let job = load_job(&job_file)?;
    let cfg = RenderConfig::from_env();
    let req = &job.request;

    println!(
        "🧭 {} → {} ({} km, {})",
        req.origin.label,
        req.destination.label,
        req.distance_km,
        if req.round_trip { "round trip" } else { "one way" }
    );

    let viewport = plan_viewport(req, &cfg);
    println!(
        "🔍 Viewport zoom={} center=({:.5}, {:.5}) canvas={}x{}",
        viewport.zoom,
        viewport.center_lat,
        viewport.center_lng,
        viewport.canvas_width,
        viewport.canvas_height
    );

    let base = match &job.base_image {
        Some(path) => {
            println!("🖼️ Using base map {}", path.display());
            image::open(path).with_context(|| format!("open base map {}", path.display()))?
        }
        None => {
            let map_cfg = StaticMapConfig::from_env();
            let request = StaticMapRequest::from_viewport(&viewport, &map_cfg);
            println!("🌐 Fetching static map for the solved viewport");
            let bytes = StaticMapClient::new(&map_cfg)?.fetch(&request).await?;
            image::load_from_memory(&bytes).context("decode static map PNG")?
        }
    };

    let output = match &job.output {
        Some(path) => path.clone(),
        None => timestamped_output_path(
            &cfg.output_dir,
            &req.origin.label,
            &req.destination.label,
            &chrono::Local::now(),
        )?,
    };

    let fonts = cfg.font_resolver();
    let path = produce_annotated_map_to(req, &viewport, base, &fonts, &cfg, &output)
        .context("render annotated map")?;

    if !is_usable_map_image(&path, cfg.min_image_bytes) {
        bail!("annotated map {} is too small to be a real map", path.display());
    }

    println!("✅ Map saved: {}", path.display());
    Ok(())
}
