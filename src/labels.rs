// src/labels.rs
//! Character-wrapped text boxes placed next to an anchor without leaving the canvas.
//!
//! Placement tries four corners around the anchor in an order picked by the
//! preferred side. A candidate must stay inside the safety margin; among those,
//! one that avoids already-occupied boxes wins. If nothing fits, the first
//! candidate is clamped onto the canvas so the label still renders.

use crate::fonts::SizedFont;
use crate::overlay::{draw_text, fill_rounded_rect};
use image::{Rgba, RgbaImage};
use log::debug;

/// Pixel measurement of rendered text.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> u32;
    fn line_height(&self) -> u32;
}

/// Axis-aligned box in canvas pixels. `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoxBounds {
    pub fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width.max(0),
            bottom: top + height.max(0),
        }
    }

    /// Square around a point, e.g. a marker.
    pub fn around(cx: i32, cy: i32, radius: i32) -> Self {
        Self::from_size(cx - radius, cy - radius, 2 * radius, 2 * radius)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::from_size(self.left + dx, self.top + dy, self.width(), self.height())
    }

    pub fn intersects(&self, other: &BoxBounds) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Whether the box keeps `margin` pixels clear of every canvas edge.
    pub fn within(&self, canvas_w: u32, canvas_h: u32, margin: i32) -> bool {
        self.left >= margin
            && self.top >= margin
            && self.right <= canvas_w as i32 - margin
            && self.bottom <= canvas_h as i32 - margin
    }
}

/// Which side of the anchor a label should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    UpperRight,
    LowerRight,
    UpperLeft,
    LowerLeft,
}

impl Side {
    fn corners(self) -> [Corner; 4] {
        match self {
            Side::Right => [
                Corner::UpperRight,
                Corner::LowerRight,
                Corner::UpperLeft,
                Corner::LowerLeft,
            ],
            Side::Left => [
                Corner::UpperLeft,
                Corner::LowerLeft,
                Corner::UpperRight,
                Corner::LowerRight,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
    /// Inner padding between the box edge and the text.
    pub padding: i32,
    /// Gap between the anchor and the nearest box corner.
    pub clearance: i32,
    /// Safety margin to the canvas edge.
    pub margin: i32,
    pub line_spacing: i32,
    pub corner_radius: i32,
    pub fill: Rgba<u8>,
    pub shadow: Rgba<u8>,
    pub shadow_offset: i32,
    pub text_color: Rgba<u8>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            padding: 10,
            clearance: 16,
            margin: 8,
            line_spacing: 4,
            corner_radius: 8,
            fill: Rgba([255, 255, 255, 225]),
            shadow: Rgba([0, 0, 0, 80]),
            shadow_offset: 2,
            text_color: Rgba([32, 33, 36, 255]),
        }
    }
}

impl LabelStyle {
    /// Default style with distances multiplied by `scale`.
    pub fn scaled(scale: f32) -> Self {
        let s = |v: f32| (v * scale).round() as i32;
        Self {
            padding: s(10.0),
            clearance: s(16.0),
            line_spacing: s(4.0),
            corner_radius: s(8.0),
            ..Self::default()
        }
    }
}

/// A planned label: wrapped lines plus where the box goes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    pub anchor: (i32, i32),
    pub lines: Vec<String>,
    pub bounds: BoxBounds,
    /// Set when no candidate fit and the box was forced onto the canvas.
    pub clamped: bool,
}

/// Greedy wrap one character at a time, so text without spaces (CJK) still breaks.
///
/// A line only exceeds `max_width` when a single character is wider than it.
/// Explicit newlines are kept and leading whitespace on wrapped lines is dropped.
pub fn wrap_chars<M: TextMeasure + ?Sized>(text: &str, max_width: u32, measure: &M) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut wrapped = false;
        for ch in paragraph.chars() {
            if wrapped && current.is_empty() && ch.is_whitespace() {
                continue;
            }
            current.push(ch);
            if current.chars().count() > 1 && measure.text_width(&current) > max_width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                wrapped = true;
                if !ch.is_whitespace() {
                    current.push(ch);
                }
            }
        }
        if !current.is_empty() || paragraph.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Candidate box for `corner`, sized `w`x`h`, around `(ax, ay)`.
fn candidate(corner: Corner, ax: i32, ay: i32, w: i32, h: i32, clearance: i32) -> BoxBounds {
    let (left, top) = match corner {
        Corner::UpperRight => (ax + clearance, ay - clearance - h),
        Corner::LowerRight => (ax + clearance, ay + clearance),
        Corner::UpperLeft => (ax - clearance - w, ay - clearance - h),
        Corner::LowerLeft => (ax - clearance - w, ay + clearance),
    };
    BoxBounds::from_size(left, top, w, h)
}

/// Push `b` onto the canvas, pinned to the top-left when it is larger than the canvas.
fn clamp_onto(b: BoxBounds, canvas_w: u32, canvas_h: u32) -> BoxBounds {
    let max_left = (canvas_w as i32 - b.width()).max(0);
    let max_top = (canvas_h as i32 - b.height()).max(0);
    BoxBounds::from_size(
        b.left.clamp(0, max_left),
        b.top.clamp(0, max_top),
        b.width(),
        b.height(),
    )
}

/// Choose where a label for `text` goes. Pure: nothing is drawn.
#[allow(clippy::too_many_arguments)]
pub fn plan_label<M: TextMeasure + ?Sized>(
    anchor: (i32, i32),
    text: &str,
    canvas_w: u32,
    canvas_h: u32,
    measure: &M,
    max_width_px: u32,
    preferred: Side,
    style: &LabelStyle,
    occupied: &[BoxBounds],
) -> LabelBox {
    let lines = wrap_chars(text, max_width_px, measure);
    let text_w = lines.iter().map(|l| measure.text_width(l)).max().unwrap_or(0) as i32;
    let n = lines.len() as i32;
    let text_h = if n == 0 {
        0
    } else {
        n * measure.line_height() as i32 + (n - 1) * style.line_spacing
    };
    let box_w = text_w + 2 * style.padding;
    let box_h = text_h + 2 * style.padding;

    let (ax, ay) = anchor;
    let candidates: Vec<BoxBounds> = preferred
        .corners()
        .iter()
        .map(|&c| candidate(c, ax, ay, box_w, box_h, style.clearance))
        .collect();

    let on_canvas = |b: &&BoxBounds| b.within(canvas_w, canvas_h, style.margin);
    let free = |b: &&BoxBounds| !occupied.iter().any(|o| b.intersects(o));

    let chosen = candidates
        .iter()
        .filter(on_canvas)
        .find(free)
        .or_else(|| candidates.iter().find(on_canvas))
        .copied();

    let (bounds, clamped) = match chosen {
        Some(b) => (b, false),
        None => {
            debug!(
                "label {:?} does not fit around ({ax}, {ay}); clamping onto the canvas",
                text
            );
            (clamp_onto(candidates[0], canvas_w, canvas_h), true)
        }
    };

    LabelBox {
        anchor,
        lines,
        bounds,
        clamped,
    }
}

/// Draw a planned label: drop shadow, rounded backing box, then the lines.
pub fn draw_label(canvas: &mut RgbaImage, font: &SizedFont, label: &LabelBox, style: &LabelStyle) {
    let shadow = label.bounds.offset(style.shadow_offset, style.shadow_offset);
    fill_rounded_rect(canvas, shadow, style.corner_radius, style.shadow);
    fill_rounded_rect(canvas, label.bounds, style.corner_radius, style.fill);

    let step = font.line_height() as i32 + style.line_spacing;
    let x = label.bounds.left + style.padding;
    for (i, line) in label.lines.iter().enumerate() {
        let y = label.bounds.top + style.padding + i as i32 * step;
        draw_text(canvas, font, x, y, line, style.text_color);
    }
}

/// Plan and draw in one go; returns the box that was used.
#[allow(clippy::too_many_arguments)]
pub fn place(
    canvas: &mut RgbaImage,
    anchor: (i32, i32),
    text: &str,
    font: &SizedFont,
    max_width_px: u32,
    preferred: Side,
    style: &LabelStyle,
    occupied: &[BoxBounds],
) -> BoxBounds {
    let (w, h) = canvas.dimensions();
    let label = plan_label(anchor, text, w, h, font, max_width_px, preferred, style, occupied);
    draw_label(canvas, font, &label, style);
    label.bounds
}
