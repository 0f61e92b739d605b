// src/overlay.rs
use crate::fonts::SizedFont;
use crate::labels::{BoxBounds, TextMeasure};
use image::{DynamicImage, ImageFormat, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;

/// Fill a rounded rectangle, blending every covered pixel exactly once.
pub fn fill_rounded_rect(img: &mut RgbaImage, b: BoxBounds, radius: i32, color: Rgba<u8>) {
    if b.width() <= 0 || b.height() <= 0 {
        return;
    }
    let r = radius.clamp(0, b.width().min(b.height()) / 2) as f32;
    let (w, h) = img.dimensions();
    let x0 = b.left.max(0);
    let y0 = b.top.max(0);
    let x1 = b.right.min(w as i32);
    let y1 = b.bottom.min(h as i32);

    for y in y0..y1 {
        let py = y as f32 + 0.5;
        let cy = py.clamp(b.top as f32 + r, b.bottom as f32 - r);
        for x in x0..x1 {
            let px = x as f32 + 0.5;
            let cx = px.clamp(b.left as f32 + r, b.right as f32 - r);
            let (dx, dy) = (px - cx, py - cy);
            if dx * dx + dy * dy <= r * r {
                img.get_pixel_mut(x as u32, y as u32).blend(&color);
            }
        }
    }
}

/// Stroke a polyline `width` pixels wide: one quad per segment, round joins and caps.
pub fn draw_thick_polyline(img: &mut RgbaImage, pts: &[(f32, f32)], width: f32, color: Rgba<u8>) {
    let half = (width / 2.0).max(0.5);
    let cap = half.round().max(1.0) as i32;

    for seg in pts.windows(2) {
        let ((ax, ay), (bx, by)) = (seg[0], seg[1]);
        let (dx, dy) = (bx - ax, by - ay);
        let len = (dx * dx + dy * dy).sqrt();
        if len < 0.5 {
            continue;
        }
        let (nx, ny) = (-dy / len * half, dx / len * half);
        let quad = [
            Point::new((ax + nx).round() as i32, (ay + ny).round() as i32),
            Point::new((bx + nx).round() as i32, (by + ny).round() as i32),
            Point::new((bx - nx).round() as i32, (by - ny).round() as i32),
            Point::new((ax - nx).round() as i32, (ay - ny).round() as i32),
        ];
        // imageproc rejects polygons whose first and last points coincide
        if quad[0] != quad[3] {
            draw_polygon_mut(img, &quad, color);
        }
    }

    for &(x, y) in pts {
        draw_filled_circle_mut(img, (x.round() as i32, y.round() as i32), cap, color);
    }
}

/// Filled disc with an outline ring, optionally with a centred letter.
pub fn draw_marker(
    img: &mut RgbaImage,
    center: (i32, i32),
    radius: i32,
    fill: Rgba<u8>,
    outline: Rgba<u8>,
    outline_width: i32,
) {
    draw_filled_circle_mut(img, center, radius + outline_width, outline);
    draw_filled_circle_mut(img, center, radius, fill);
}

pub fn draw_marker_letter(
    img: &mut RgbaImage,
    center: (i32, i32),
    font: &SizedFont,
    letter: &str,
    color: Rgba<u8>,
) {
    let tw = font.text_width(letter) as i32;
    let th = font.line_height() as i32;
    draw_text(img, font, center.0 - tw / 2, center.1 - th / 2, letter, color);
}

/// Draw text with its top-left line box at (x, y).
pub fn draw_text(img: &mut RgbaImage, font: &SizedFont, x: i32, y: i32, text: &str, color: Rgba<u8>) {
    draw_text_mut(img, color, x, y, font.scale(), font.font(), text);
}

/// Text stroked in `halo` at every offset within `halo_px`, then drawn in `color` on top.
#[allow(clippy::too_many_arguments)]
pub fn draw_text_with_halo(
    img: &mut RgbaImage,
    font: &SizedFont,
    x: i32,
    y: i32,
    text: &str,
    color: Rgba<u8>,
    halo: Rgba<u8>,
    halo_px: i32,
) {
    for dy in -halo_px..=halo_px {
        for dx in -halo_px..=halo_px {
            if dx == 0 && dy == 0 {
                continue;
            }
            draw_text(img, font, x + dx, y + dy, text, halo);
        }
    }
    draw_text(img, font, x, y, text, color);
}

/// Encode to PNG bytes in memory.
pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}
