// src/coords.rs
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Latitude limit of the Web-Mercator square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;
/// Width of the world in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
/// Keeps `ln((1+s)/(1-s))` finite near the poles.
const SIN_LAT_LIMIT: f64 = 0.9999;

/// A geocoded place. `label` carries the formatted address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(alias = "formatted_address", default)]
    pub label: String,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            label: label.into(),
        }
    }
}

/// Absolute Mercator pixel position of (lat, lng) at `zoom`.
/// Origin is the top-left corner of the world (lng -180, lat +85.05), y grows southward.
pub fn world_pixel(lat: f64, lng: f64, zoom: u32) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let size = TILE_SIZE * 2f64.powi(zoom as i32);

    let sin_lat = lat.to_radians().sin().clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);
    let x = size * (0.5 + lng / 360.0);
    let y = size * (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI));
    (x, y)
}

/// Canvas pixel of (lat, lng) when the canvas is centred on (center_lat, center_lng).
pub fn project(
    lat: f64,
    lng: f64,
    zoom: u32,
    canvas_w: u32,
    canvas_h: u32,
    center_lat: f64,
    center_lng: f64,
) -> (f64, f64) {
    let (px, py) = world_pixel(lat, lng, zoom);
    let (cx, cy) = world_pixel(center_lat, center_lng, zoom);
    (
        px - cx + canvas_w as f64 / 2.0,
        py - cy + canvas_h as f64 / 2.0,
    )
}
