// src/config.rs
use crate::fonts::{default_locators, BundledAsset, FontLocator, FontResolver};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key).map_or(false, |v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Settings for one render, normally read from the environment.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Minimum distance between an endpoint marker and the canvas edge.
    pub padding_px: u32,
    pub max_zoom: u32,
    pub label_max_width_px: u32,
    pub timestamp_prefix: String,
    /// Stack a report title band above the map.
    pub report_header: bool,
    pub font_dir: PathBuf,
    /// Extra font files tried before the bundled ones.
    pub font_paths: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Outputs at or below this size are treated as failed renders.
    pub min_image_bytes: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1200,
            canvas_height: 800,
            padding_px: 120,
            max_zoom: crate::viewport::MAX_ZOOM,
            label_max_width_px: 420,
            timestamp_prefix: "Generated".to_string(),
            report_header: false,
            font_dir: PathBuf::from("assets/fonts"),
            font_paths: Vec::new(),
            output_dir: PathBuf::from("temp_maps"),
            min_image_bytes: 10 * 1024,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            canvas_width: env_or("MAP_CANVAS_WIDTH", d.canvas_width),
            canvas_height: env_or("MAP_CANVAS_HEIGHT", d.canvas_height),
            padding_px: env_or("MAP_PADDING_PX", d.padding_px),
            max_zoom: env_or("MAP_MAX_ZOOM", d.max_zoom),
            label_max_width_px: env_or("MAP_LABEL_MAX_WIDTH_PX", d.label_max_width_px),
            timestamp_prefix: env::var("MAP_TIMESTAMP_PREFIX").unwrap_or(d.timestamp_prefix),
            report_header: env_flag("MAP_REPORT_HEADER"),
            font_dir: env::var_os("MAP_FONT_DIR").map(PathBuf::from).unwrap_or(d.font_dir),
            font_paths: env::var_os("MAP_FONT_PATHS")
                .map(|v| env::split_paths(&v).collect())
                .unwrap_or_default(),
            output_dir: env::var_os("MAP_OUTPUT_DIR").map(PathBuf::from).unwrap_or(d.output_dir),
            min_image_bytes: env_or("MAP_MIN_IMAGE_BYTES", d.min_image_bytes),
        }
    }

    /// Explicit font files, then bundled assets, then OS font folders.
    pub fn font_resolver(&self) -> FontResolver {
        let mut locators: Vec<Box<dyn FontLocator>> = self
            .font_paths
            .iter()
            .map(|p| Box::new(BundledAsset::new(p)) as Box<dyn FontLocator>)
            .collect();
        locators.extend(default_locators(&self.font_dir));
        FontResolver::new(locators)
    }
}

/// Where and how base maps are downloaded.
#[derive(Debug, Clone)]
pub struct StaticMapConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub map_type: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl StaticMapConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("GOOGLE_MAPS_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var("MAP_STATIC_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api/staticmap".to_string()),
            map_type: env::var("MAP_TYPE").unwrap_or_else(|_| "roadmap".to_string()),
            timeout: Duration::from_secs(env_or("MAP_FETCH_TIMEOUT_SECS", 30)),
            max_retries: env_or("MAP_FETCH_RETRIES", 3usize).max(1),
        }
    }
}
