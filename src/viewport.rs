// src/viewport.rs
use crate::coords::{project, GeoPoint};
use log::{debug, warn};
use serde::Serialize;

/// Highest zoom the static-map providers serve.
pub const MAX_ZOOM: u32 = 21;

/// Zoom level and center that a fixed-size canvas displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub zoom: u32,
    pub center_lat: f64,
    pub center_lng: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Viewport {
    /// Canvas pixel of a geographic position under this viewport.
    pub fn project(&self, lat: f64, lng: f64) -> (f64, f64) {
        project(
            lat,
            lng,
            self.zoom,
            self.canvas_width,
            self.canvas_height,
            self.center_lat,
            self.center_lng,
        )
    }

    pub fn project_point(&self, p: &GeoPoint) -> (f64, f64) {
        self.project(p.latitude, p.longitude)
    }

    /// True when `p` lands inside the canvas shrunk by `padding` on every side.
    pub fn contains_padded(&self, p: &GeoPoint, padding: u32) -> bool {
        let (x, y) = self.project_point(p);
        let pad = padding as f64;
        x >= pad
            && x <= self.canvas_width as f64 - pad
            && y >= pad
            && y <= self.canvas_height as f64 - pad
    }
}

/// Tightest viewport showing both points at least `padding_px` from every edge.
///
/// The center is the arithmetic midpoint of the two points. Zoom is searched
/// downward from [`MAX_ZOOM`]. If no zoom honours the padding the search is
/// repeated without padding, and zoom 0 is the last resort.
pub fn solve(a: &GeoPoint, b: &GeoPoint, canvas_w: u32, canvas_h: u32, padding_px: u32) -> Viewport {
    solve_with_max_zoom(a, b, canvas_w, canvas_h, padding_px, MAX_ZOOM)
}

pub fn solve_with_max_zoom(
    a: &GeoPoint,
    b: &GeoPoint,
    canvas_w: u32,
    canvas_h: u32,
    padding_px: u32,
    max_zoom: u32,
) -> Viewport {
    let center_lat = (a.latitude + b.latitude) / 2.0;
    let center_lng = (a.longitude + b.longitude) / 2.0;

    let at_zoom = |zoom| Viewport {
        zoom,
        center_lat,
        center_lng,
        canvas_width: canvas_w,
        canvas_height: canvas_h,
    };

    let search = |padding: u32| {
        (0..=max_zoom)
            .rev()
            .map(at_zoom)
            .find(|vp| vp.contains_padded(a, padding) && vp.contains_padded(b, padding))
    };

    if let Some(vp) = search(padding_px) {
        debug!(
            "viewport zoom={} center=({:.5}, {:.5})",
            vp.zoom, vp.center_lat, vp.center_lng
        );
        return vp;
    }

    warn!(
        "no zoom keeps both endpoints {}px from the edge of a {}x{} canvas; retrying without padding",
        padding_px, canvas_w, canvas_h
    );
    search(0).unwrap_or_else(|| at_zoom(0))
}
