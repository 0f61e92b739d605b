use image::{DynamicImage, Rgba, RgbaImage};
use route_map_annotator::{
    plan_viewport, produce_annotated_map_to, produce_annotated_map_with, Compositor, FontResolver,
    GeoPoint, MapRequest, RenderConfig, RenderError,
};
use tempfile::TempDir;

const PAPER: Rgba<u8> = Rgba([242, 239, 233, 255]);

fn sierra_trip() -> MapRequest {
    MapRequest {
        origin: GeoPoint::new(38.5, -120.2, "台灣高雄市苓雅區四維三路2號"),
        destination: GeoPoint::new(43.252, -126.453, "高雄市鼓山區蓮海路70號"),
        polyline: "_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string(),
        alternative_polylines: vec!["_p~iF~ps|U_mqNvxq`@".to_string()],
        distance_km: 9.55,
        round_trip: true,
        date: Some("2026-10-17".to_string()),
    }
}

fn base(cfg: &RenderConfig) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(cfg.canvas_width, cfg.canvas_height, PAPER))
}

fn host_fonts(cfg: &RenderConfig) -> Option<FontResolver> {
    let fonts = cfg.font_resolver();
    match fonts.resolve_face() {
        Ok(face) => {
            eprintln!("rendering with {} (face {})", face.source().display(), face.index());
            Some(fonts)
        }
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

#[test]
fn missing_fonts_abort_without_writing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("map.png");
    let cfg = RenderConfig::default();
    let req = sierra_trip();
    let vp = plan_viewport(&req, &cfg);

    let err = produce_annotated_map_to(&req, &vp, base(&cfg), &FontResolver::default(), &cfg, &out)
        .unwrap_err();
    assert!(matches!(err, RenderError::FontNotFound { .. }));
    assert!(!out.exists());
}

#[test]
fn mismatched_base_map_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("map.png");
    let cfg = RenderConfig::default();
    let req = sierra_trip();
    let vp = plan_viewport(&req, &cfg);
    let square = DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 640, PAPER));

    let err = produce_annotated_map_to(&req, &vp, square, &FontResolver::default(), &cfg, &out)
        .unwrap_err();
    assert!(matches!(err, RenderError::CanvasMismatch { .. }));
    assert!(!out.exists());
}

#[test]
fn renders_png_with_canvas_dimensions() {
    let cfg = RenderConfig::default();
    let Some(fonts) = host_fonts(&cfg) else {
        return;
    };
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("nested").join("map.png");
    let req = sierra_trip();
    let vp = plan_viewport(&req, &cfg);

    let path = produce_annotated_map_to(&req, &vp, base(&cfg), &fonts, &cfg, &out).unwrap();
    assert_eq!(path, out);

    let rendered = image::open(&path).unwrap().into_rgba8();
    assert_eq!(rendered.dimensions(), (cfg.canvas_width, cfg.canvas_height));

    let (mx, my) = vp.project_point(&req.origin);
    let ring = rendered.get_pixel(mx.round() as u32 + 12, my.round() as u32);
    assert_ne!(*ring, PAPER, "origin marker missing");
    assert!(rendered.pixels().any(|p| p[2] > 200 && p[0] < 100), "main route not drawn");
}

#[test]
fn header_band_is_stacked_above_the_map() {
    let cfg = RenderConfig {
        report_header: true,
        ..RenderConfig::default()
    };
    let Some(fonts) = host_fonts(&cfg) else {
        return;
    };
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("map.png");
    let req = sierra_trip();
    let vp = plan_viewport(&req, &cfg);

    produce_annotated_map_to(&req, &vp, base(&cfg), &fonts, &cfg, &out).unwrap();

    let rendered = image::open(&out).unwrap().into_rgba8();
    assert_eq!(rendered.width(), cfg.canvas_width);
    assert!(rendered.height() > cfg.canvas_height);
    assert_eq!(*rendered.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    assert_eq!(*rendered.get_pixel(0, rendered.height() - 1), PAPER);
}

#[test]
fn one_compositor_serves_several_renders() {
    let cfg = RenderConfig::default();
    let Some(fonts) = host_fonts(&cfg) else {
        return;
    };
    let compositor = Compositor::new(&fonts, &cfg).unwrap();
    let tmp = TempDir::new().unwrap();

    let outbound = sierra_trip();
    let mut inbound = sierra_trip();
    std::mem::swap(&mut inbound.origin, &mut inbound.destination);
    inbound.round_trip = false;

    for (i, req) in [outbound, inbound].iter().enumerate() {
        let vp = plan_viewport(req, &cfg);
        let out = tmp.path().join(format!("leg_{i}.png"));
        let path = produce_annotated_map_with(&compositor, req, &vp, base(&cfg), &cfg, &out).unwrap();
        let rendered = image::open(&path).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (cfg.canvas_width, cfg.canvas_height));
    }
}

#[test]
fn reused_compositor_still_checks_the_base_map() {
    let cfg = RenderConfig::default();
    let Some(fonts) = host_fonts(&cfg) else {
        return;
    };
    let compositor = Compositor::new(&fonts, &cfg).unwrap();
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("map.png");
    let req = sierra_trip();
    let vp = plan_viewport(&req, &cfg);
    let square = DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 640, PAPER));

    let err = produce_annotated_map_with(&compositor, &req, &vp, square, &cfg, &out).unwrap_err();
    assert!(matches!(err, RenderError::CanvasMismatch { .. }));
    assert!(!out.exists());
}
