// src/route.rs
use crate::error::{RenderError, RenderResult};
use crate::viewport::Viewport;

/// Decimal places carried by the encoded-polyline format used by directions APIs.
const POLYLINE_PRECISION: u32 = 5;

/// A decoded route as (latitude, longitude) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePath {
    points: Vec<(f64, f64)>,
}

impl RoutePath {
    /// Decode an encoded polyline. Paths copied out of JSON sometimes keep
    /// their escaped backslashes, so those are collapsed first.
    pub fn decode(encoded: &str) -> RenderResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(Self::default());
        }
        let encoded = encoded.replace("\\\\", "\\");
        let line = polyline::decode_polyline(&encoded, POLYLINE_PRECISION)
            .map_err(|e| RenderError::Polyline(e.to_string()))?;

        Ok(Self {
            points: line.coords().map(|c| (c.y, c.x)).collect(),
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Project every vertex onto the canvas.
    pub fn to_pixels(&self, viewport: &Viewport) -> Vec<(f32, f32)> {
        self.points
            .iter()
            .map(|&(lat, lng)| {
                let (x, y) = viewport.project(lat, lng);
                (x as f32, y as f32)
            })
            .collect()
    }
}

/// The main route plus any alternatives returned by the directions service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGeometry {
    pub main: RoutePath,
    pub alternatives: Vec<RoutePath>,
}

impl RouteGeometry {
    pub fn decode(main: &str, alternatives: &[String]) -> RenderResult<Self> {
        Ok(Self {
            main: RoutePath::decode(main)?,
            alternatives: alternatives
                .iter()
                .map(|alt| RoutePath::decode(alt))
                .collect::<RenderResult<Vec<_>>>()?,
        })
    }
}
