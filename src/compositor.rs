// src/compositor.rs
//! The render pipeline: base map in, annotated PNG out.
//!
//! Stages run strictly in order on a copy of the base bitmap: alternative
//! routes, main route, endpoint markers, distance badge, address labels,
//! timestamp, optional header band. The PNG is encoded in memory and written
//! with a single call, so a failure never leaves a half-written file behind.

use crate::config::RenderConfig;
use crate::coords::GeoPoint;
use crate::error::{RenderError, RenderResult};
use crate::fonts::{FontFace, FontResolver, SizedFont};
use crate::labels::{
    draw_label, plan_label, wrap_chars, BoxBounds, LabelBox, LabelStyle, Side, TextMeasure,
};
use crate::overlay::{
    draw_marker, draw_marker_letter, draw_text, draw_text_with_halo, draw_thick_polyline,
    encode_png, fill_rounded_rect,
};
use crate::report_text::{clean_address, distance_badge_text, timestamp_text};
use crate::route::RouteGeometry;
use crate::viewport::Viewport;
use chrono::{DateTime, Local};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const MAIN_ROUTE: Rgba<u8> = Rgba([66, 133, 244, 255]);
const ALT_ROUTE: Rgba<u8> = Rgba([128, 128, 128, 255]);
const MARKER_FILL: Rgba<u8> = Rgba([234, 67, 53, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BADGE_TEXT: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BADGE_SHADOW: Rgba<u8> = Rgba([0, 0, 0, 70]);
const DARK_TEXT: Rgba<u8> = Rgba([32, 33, 36, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Everything one annotated map is drawn from.
#[derive(Debug, Clone)]
pub struct RouteRender {
    pub base_image: RgbaImage,
    pub viewport: Viewport,
    pub route: RouteGeometry,
    /// Value printed in the badge, already one-way or round-trip.
    pub distance_km: f64,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Title for the optional header band.
    pub header: Option<String>,
    pub generated_at: DateTime<Local>,
}

/// Text and stroke sizes grow with the canvas; 1000px wide is 1.0.
pub fn scale_for(width: u32) -> f32 {
    (width as f32 / 1000.0).max(0.8)
}

/// Make the base bitmap match the viewport canvas.
///
/// Same aspect ratio (e.g. a `scale=2` static map) is resized; anything else
/// would misplace every marker and is rejected.
pub fn fit_base_to_viewport(base: DynamicImage, viewport: &Viewport) -> RenderResult<RgbaImage> {
    let (w, h) = (base.width(), base.height());
    let (ew, eh) = (viewport.canvas_width, viewport.canvas_height);
    if (w, h) == (ew, eh) {
        return Ok(base.into_rgba8());
    }
    if w as u64 * eh as u64 == h as u64 * ew as u64 {
        debug!("resizing base map {w}x{h} to {ew}x{eh}");
        return Ok(imageops::resize(&base.into_rgba8(), ew, eh, FilterType::Triangle));
    }
    Err(RenderError::CanvasMismatch {
        actual_width: w,
        actual_height: h,
        expected_width: ew,
        expected_height: eh,
    })
}

pub struct Compositor {
    face: FontFace,
    label_max_width_px: u32,
    timestamp_prefix: String,
}

impl Compositor {
    /// Resolves the font up front: without one there is nothing to render.
    pub fn new(fonts: &FontResolver, cfg: &RenderConfig) -> RenderResult<Self> {
        Ok(Self {
            face: fonts.resolve_face()?,
            label_max_width_px: cfg.label_max_width_px,
            timestamp_prefix: cfg.timestamp_prefix.clone(),
        })
    }

    /// Draw all annotations onto a fresh copy of the base bitmap.
    pub fn compose(&self, job: &RouteRender) -> RgbaImage {
        let mut canvas = job.base_image.clone();
        let (w, h) = canvas.dimensions();
        let s = scale_for(w);
        let vp = &job.viewport;

        for alt in &job.route.alternatives {
            draw_thick_polyline(&mut canvas, &alt.to_pixels(vp), 4.0 * s, ALT_ROUTE);
        }
        draw_thick_polyline(&mut canvas, &job.route.main.to_pixels(vp), 6.0 * s, MAIN_ROUTE);

        let radius = (11.0 * s).round() as i32;
        let ring = (2.0 * s).round().max(1.0) as i32;
        let letter_font = self.face.sized(radius as f32 * 1.5);
        let a = pixel(vp.project_point(&job.origin));
        let b = pixel(vp.project_point(&job.destination));
        let mut occupied = Vec::with_capacity(5);
        for (center, letter) in [(a, "A"), (b, "B")] {
            draw_marker(&mut canvas, center, radius, MARKER_FILL, WHITE, ring);
            draw_marker_letter(&mut canvas, center, &letter_font, letter, WHITE);
            occupied.push(BoxBounds::around(center.0, center.1, radius + ring));
        }

        let badge_font = self.face.sized(48.0 * s);
        occupied.push(draw_badge(&mut canvas, &badge_font, &distance_badge_text(job.distance_km), s));

        // each address label leans away from the other endpoint
        let (origin_side, dest_side) = if a.0 <= b.0 {
            (Side::Left, Side::Right)
        } else {
            (Side::Right, Side::Left)
        };
        let endpoints: Vec<((i32, i32), String, Side)> = [
            (a, "A", origin_side, &job.origin),
            (b, "B", dest_side, &job.destination),
        ]
        .into_iter()
        .filter_map(|(anchor, letter, side, point)| {
            let address = clean_address(&point.label);
            (!address.is_empty()).then(|| (anchor, format!("{letter}  {address}"), side))
        })
        .collect();

        let label_font = self.face.sized(26.0 * s);
        let stamp_font = self.face.sized(20.0 * s);
        let style = LabelStyle::scaled(s);
        let stamp = timestamp_text(&self.timestamp_prefix, &job.generated_at);
        let (address_labels, stamp_label) = plan_text_boxes(
            (w, h),
            &endpoints,
            &label_font,
            self.label_max_width_px,
            &style,
            &stamp,
            &stamp_font,
            occupied,
        );

        for label in &address_labels {
            draw_label(&mut canvas, &label_font, label, &style);
        }
        draw_timestamp(&mut canvas, &stamp_font, &stamp_label);

        match &job.header {
            Some(title) => stack_header(&canvas, &self.face.sized(32.0 * s), title, s),
            None => canvas,
        }
    }

    /// Compose and persist to `output`, returning the written path.
    pub fn render(&self, job: &RouteRender, output: &Path) -> RenderResult<PathBuf> {
        let annotated = self.compose(job);
        let bytes = encode_png(annotated)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(output, &bytes).map_err(|source| RenderError::Io {
            path: output.to_path_buf(),
            source,
        })?;

        info!("🗺️ saved annotated map to {} ({} bytes)", output.display(), bytes.len());
        Ok(output.to_path_buf())
    }
}

fn pixel((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Distance badge in the top-left corner; returns its box.
fn draw_badge(canvas: &mut RgbaImage, font: &SizedFont, text: &str, s: f32) -> BoxBounds {
    let inset = (20.0 * s).round() as i32;
    let pad_x = (20.0 * s).round() as i32;
    let pad_y = (10.0 * s).round() as i32;
    let radius = (8.0 * s).round() as i32;

    let tw = font.text_width(text) as i32;
    let th = font.line_height() as i32;
    let b = BoxBounds::from_size(inset, inset, tw + 2 * pad_x, th + 2 * pad_y);

    fill_rounded_rect(canvas, b.offset(2, 2), radius, BADGE_SHADOW);
    fill_rounded_rect(canvas, b, radius, WHITE);
    draw_text(canvas, font, b.left + pad_x, b.top + pad_y, text, BADGE_TEXT);
    b
}

const STAMP_HALO_PX: i32 = 2;

fn stamp_style() -> LabelStyle {
    LabelStyle {
        padding: STAMP_HALO_PX,
        clearance: 0,
        line_spacing: 2,
        ..LabelStyle::default()
    }
}

/// Place the timestamp and the address labels without drawing anything.
///
/// The timestamp is pinned bottom-right first and its box joins `occupied`,
/// so the address labels steer around it as they do around markers.
#[allow(clippy::too_many_arguments)]
fn plan_text_boxes<M: TextMeasure + ?Sized>(
    (w, h): (u32, u32),
    endpoints: &[((i32, i32), String, Side)],
    label_measure: &M,
    label_max_width_px: u32,
    style: &LabelStyle,
    stamp: &str,
    stamp_measure: &M,
    mut occupied: Vec<BoxBounds>,
) -> (Vec<LabelBox>, LabelBox) {
    let stamp_style = stamp_style();
    let corner = (w as i32 - stamp_style.margin, h as i32 - stamp_style.margin);
    let stamp_label = plan_label(corner, stamp, w, h, stamp_measure, w / 2, Side::Left, &stamp_style, &[]);
    occupied.push(stamp_label.bounds);

    let mut labels = Vec::with_capacity(endpoints.len());
    for (anchor, text, side) in endpoints {
        let label = plan_label(
            *anchor,
            text,
            w,
            h,
            label_measure,
            label_max_width_px,
            *side,
            style,
            &occupied,
        );
        occupied.push(label.bounds);
        labels.push(label);
    }
    (labels, stamp_label)
}

/// Timestamp text with a light halo instead of a backing box.
fn draw_timestamp(canvas: &mut RgbaImage, font: &SizedFont, label: &LabelBox) {
    let style = stamp_style();
    let step = font.line_height() as i32 + style.line_spacing;
    for (i, line) in label.lines.iter().enumerate() {
        let x = label.bounds.left + style.padding;
        let y = label.bounds.top + style.padding + i as i32 * step;
        draw_text_with_halo(canvas, font, x, y, line, DARK_TEXT, WHITE, STAMP_HALO_PX);
    }
}

/// White title band above the map; map pixels are copied unchanged.
fn stack_header(map: &RgbaImage, font: &SizedFont, title: &str, s: f32) -> RgbaImage {
    let (w, h) = map.dimensions();
    let pad = (20.0 * s).round() as i32;
    let spacing = (6.0 * s).round() as i32;
    let max_width = (w as i32 - 2 * pad).max(1) as u32;

    let lines = wrap_chars(title, max_width, font);
    let step = font.line_height() as i32 + spacing;
    let band = (lines.len() as i32 * step - spacing + 2 * pad).max(0) as u32;

    let mut out = RgbaImage::from_pixel(w, h + band, WHITE);
    imageops::replace(&mut out, map, 0, band as i64);
    for (i, line) in lines.iter().enumerate() {
        draw_text(&mut out, font, pad, pad + i as i32 * step, line, BLACK);
    }
    if lines.is_empty() {
        warn!("report header requested with an empty title");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(w: u32, h: u32) -> Viewport {
        Viewport {
            zoom: 10,
            center_lat: 22.8,
            center_lng: 120.26,
            canvas_width: w,
            canvas_height: h,
        }
    }

    #[test]
    fn matching_base_passes_through() {
        let base = DynamicImage::ImageRgba8(RgbaImage::new(1200, 800));
        let fitted = fit_base_to_viewport(base, &viewport(1200, 800)).unwrap();
        assert_eq!(fitted.dimensions(), (1200, 800));
    }

    #[test]
    fn double_resolution_base_is_downscaled() {
        let base = DynamicImage::ImageRgba8(RgbaImage::new(2400, 1600));
        let fitted = fit_base_to_viewport(base, &viewport(1200, 800)).unwrap();
        assert_eq!(fitted.dimensions(), (1200, 800));
    }

    #[test]
    fn different_aspect_ratio_is_rejected() {
        let base = DynamicImage::ImageRgba8(RgbaImage::new(800, 600));
        assert!(matches!(
            fit_base_to_viewport(base, &viewport(1200, 800)),
            Err(RenderError::CanvasMismatch {
                actual_width: 800,
                expected_width: 1200,
                ..
            })
        ));
    }

    #[test]
    fn compositor_without_fonts_fails_loudly() {
        let result = Compositor::new(&FontResolver::default(), &RenderConfig::default());
        assert!(matches!(result, Err(RenderError::FontNotFound { .. })));
    }

    /// Every character is `advance` wide; lines are 20px tall.
    struct FixedAdvance {
        advance: u32,
    }

    impl TextMeasure for FixedAdvance {
        fn text_width(&self, text: &str) -> u32 {
            text.chars().count() as u32 * self.advance
        }

        fn line_height(&self) -> u32 {
            20
        }
    }

    const STAMP: &str = "Generated 2026-10-17 09:05";

    #[test]
    fn timestamp_sits_in_the_bottom_right_margin() {
        let m = FixedAdvance { advance: 20 };
        let (labels, stamp) = plan_text_boxes((1200, 800), &[], &m, 420, &LabelStyle::default(), STAMP, &m, vec![]);
        assert!(labels.is_empty());
        assert_eq!((stamp.bounds.right, stamp.bounds.bottom), (1192, 792));
        assert!(!stamp.clamped);
    }

    #[test]
    fn address_labels_steer_around_the_timestamp() {
        let m = FixedAdvance { advance: 20 };
        // upper-right of this anchor would cover the timestamp; upper-left is free
        let endpoints = vec![((500, 790), "A  高雄市苓雅區".to_string(), Side::Right)];
        let (labels, stamp) = plan_text_boxes(
            (1200, 800),
            &endpoints,
            &m,
            420,
            &LabelStyle::default(),
            STAMP,
            &m,
            vec![],
        );

        assert_eq!(labels.len(), 1);
        assert!(!labels[0].bounds.intersects(&stamp.bounds), "{:?} vs {:?}", labels[0].bounds, stamp.bounds);
        assert!(labels[0].bounds.right <= 500);
    }

    #[test]
    fn later_labels_avoid_earlier_ones() {
        let m = FixedAdvance { advance: 20 };
        let endpoints = vec![
            ((600, 400), "A  苓雅區".to_string(), Side::Right),
            ((610, 400), "B  鼓山區".to_string(), Side::Right),
        ];
        let (labels, _) = plan_text_boxes((1200, 800), &endpoints, &m, 420, &LabelStyle::default(), STAMP, &m, vec![]);
        assert!(!labels[0].bounds.intersects(&labels[1].bounds));
    }

    #[test]
    fn scale_has_a_floor() {
        assert_eq!(scale_for(1200), 1.2);
        assert_eq!(scale_for(400), 0.8);
    }
}
