// src/lib.rs
//! Annotated route maps for mileage reports.
//!
//! A trip (two geocoded endpoints plus the directions polyline) is framed by
//! [`plan_viewport`], a base map for that exact viewport is obtained (fetched
//! through [`static_map`] or supplied by the caller), and
//! [`produce_annotated_map`] draws routes, markers, distance badge, address
//! labels and timestamp onto it before saving a PNG.

pub mod compositor;
pub mod config;
pub mod coords;
pub mod error;
pub mod fonts;
pub mod labels;
pub mod output;
pub mod overlay;
pub mod report_text;
pub mod route;
pub mod static_map;
pub mod viewport;

pub use compositor::{Compositor, RouteRender};
pub use config::{RenderConfig, StaticMapConfig};
pub use coords::GeoPoint;
pub use error::{RenderError, RenderResult};
pub use fonts::FontResolver;
pub use report_text::DistanceMode;
pub use viewport::Viewport;

use chrono::Local;
use image::DynamicImage;
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One trip to draw, as supplied by the directions lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct MapRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Encoded main route; empty draws markers only.
    #[serde(default)]
    pub polyline: String,
    #[serde(default)]
    pub alternative_polylines: Vec<String>,
    /// One-way driving distance.
    pub distance_km: f64,
    #[serde(default)]
    pub round_trip: bool,
    /// Trip date as entered by the user, used in the header band.
    #[serde(default)]
    pub date: Option<String>,
}

impl MapRequest {
    pub fn distance_mode(&self) -> DistanceMode {
        if self.round_trip {
            DistanceMode::RoundTrip
        } else {
            DistanceMode::OneWay
        }
    }
}

pub fn plan_viewport(req: &MapRequest, cfg: &RenderConfig) -> Viewport {
    viewport::solve_with_max_zoom(
        &req.origin,
        &req.destination,
        cfg.canvas_width,
        cfg.canvas_height,
        cfg.padding_px,
        cfg.max_zoom,
    )
}

/// Render into a fresh timestamped file under `cfg.output_dir`.
pub fn produce_annotated_map(
    req: &MapRequest,
    viewport: &Viewport,
    base: DynamicImage,
    fonts: &FontResolver,
    cfg: &RenderConfig,
) -> RenderResult<PathBuf> {
    let output = output::timestamped_output_path(
        &cfg.output_dir,
        &req.origin.label,
        &req.destination.label,
        &Local::now(),
    )?;
    produce_annotated_map_to(req, viewport, base, fonts, cfg, &output)
}

/// Render into `output`. Nothing is written unless every stage succeeds.
pub fn produce_annotated_map_to(
    req: &MapRequest,
    viewport: &Viewport,
    base: DynamicImage,
    fonts: &FontResolver,
    cfg: &RenderConfig,
    output: &Path,
) -> RenderResult<PathBuf> {
    let route = route::RouteGeometry::decode(&req.polyline, &req.alternative_polylines)?;
    let base_image = compositor::fit_base_to_viewport(base, viewport)?;
    let compositor = Compositor::new(fonts, cfg)?;
    render_job(&compositor, req, viewport, route, base_image, cfg, output)
}

/// Same as [`produce_annotated_map_to`], reusing an already loaded font.
/// Batch exports build one [`Compositor`] and pass it to every render.
pub fn produce_annotated_map_with(
    compositor: &Compositor,
    req: &MapRequest,
    viewport: &Viewport,
    base: DynamicImage,
    cfg: &RenderConfig,
    output: &Path,
) -> RenderResult<PathBuf> {
    let route = route::RouteGeometry::decode(&req.polyline, &req.alternative_polylines)?;
    let base_image = compositor::fit_base_to_viewport(base, viewport)?;
    render_job(compositor, req, viewport, route, base_image, cfg, output)
}

fn render_job(
    compositor: &Compositor,
    req: &MapRequest,
    viewport: &Viewport,
    route: route::RouteGeometry,
    base_image: image::RgbaImage,
    cfg: &RenderConfig,
    output: &Path,
) -> RenderResult<PathBuf> {
    let header = cfg.report_header.then(|| {
        report_text::header_text(
            &report_text::format_report_date(req.date.as_deref(), Local::now().date_naive()),
            &report_text::clean_address(&req.origin.label),
            &report_text::clean_address(&req.destination.label),
            DistanceMode::RoundTrip.badge_km(req.distance_km),
        )
    });

    let job = RouteRender {
        base_image,
        viewport: *viewport,
        route,
        distance_km: req.distance_mode().badge_km(req.distance_km),
        origin: req.origin.clone(),
        destination: req.destination.clone(),
        header,
        generated_at: Local::now(),
    };

    let path = compositor.render(&job, output)?;
    if !output::is_usable_map_image(&path, cfg.min_image_bytes) {
        warn!(
            "{} is not larger than {} bytes; the base map may be blank",
            path.display(),
            cfg.min_image_bytes
        );
    }
    Ok(path)
}
