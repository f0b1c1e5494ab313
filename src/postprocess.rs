use tracing::{debug, instrument, trace};

use crate::contours::ContourCandidate;
use crate::engine::{ImageEngine, Result};
use crate::geometry::{CropPolygon, OrientedRect};
use crate::image_impl::{Point2f, Point2i};
use crate::types::{PolygonFilterConfig, RectFilterConfig};

/// Signed angle in degrees from the direction of `other` to the direction of
/// `edge`, normalised into (-180, 180].
pub fn exterior_angle_deg(edge: (Point2f, Point2f), other: (Point2f, Point2f)) -> f64 {
    let dir = |(a, b): (Point2f, Point2f)| ((b.y - a.y) as f64).atan2((b.x - a.x) as f64);
    let degrees = (dir(other) - dir(edge)).to_degrees();

    if degrees <= -180.0 {
        degrees + 360.0
    } else if degrees > 180.0 {
        degrees - 360.0
    } else {
        degrees
    }
}

/// Closed polyline edges: each vertex to the next, last back to first.
fn closed_edges(vertices: &[Point2f]) -> Vec<(Point2f, Point2f)> {
    let n = vertices.len();
    (0..n).map(|i| (vertices[i], vertices[(i + 1) % n])).collect()
}

/// Keeps 4-vertex approximations whose corners are all close to right angles.
pub struct RectFilter<'a> {
    pub cfg: &'a RectFilterConfig,
}

impl<'a> RectFilter<'a> {
    pub fn new(cfg: &'a RectFilterConfig) -> Self {
        Self { cfg }
    }

    /// Closed range check on a single corner angle.
    pub fn accepts_angle(&self, angle: f64) -> bool {
        angle >= self.cfg.min_angle && angle <= self.cfg.max_angle
    }

    /// True when every adjacent-edge angle lies in `[min_angle, max_angle]`.
    /// Stops at the first corner outside the range.
    pub fn is_rectangle(&self, quad: &[Point2f]) -> bool {
        let edges = closed_edges(quad);
        let n = edges.len();
        (0..n).all(|i| {
            let angle = exterior_angle_deg(edges[(i + 1) % n], edges[i]).abs();
            let ok = self.accepts_angle(angle);
            if !ok {
                trace!(corner = i, angle, "Corner outside angle range");
            }
            ok
        })
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn apply<E: ImageEngine>(
        &self,
        engine: &E,
        candidates: &[ContourCandidate],
    ) -> Result<Vec<OrientedRect>> {
        let mut rects = Vec::new();

        for (idx, c) in candidates.iter().enumerate() {
            if c.area < self.cfg.min_area {
                trace!(idx, area = c.area, "Below area floor");
                continue;
            }

            if c.approx.len() != 4 {
                trace!(idx, vertices = c.approx.len(), "Not a quadrilateral");
                continue;
            }

            let quad = to_float(&c.approx);
            if !self.is_rectangle(&quad) {
                continue;
            }

            rects.push(engine.min_area_rect(&quad)?);
        }

        debug!(accepted = rects.len(), "Rectangle candidates");
        Ok(rects)
    }
}

/// Keeps any sufficiently large approximation with enough vertices.
pub struct PolygonFilter<'a> {
    pub cfg: &'a PolygonFilterConfig,
}

impl<'a> PolygonFilter<'a> {
    pub fn new(cfg: &'a PolygonFilterConfig) -> Self {
        Self { cfg }
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn apply(&self, candidates: &[ContourCandidate]) -> Vec<CropPolygon> {
        let polys: Vec<CropPolygon> = candidates
            .iter()
            .filter(|c| c.area >= self.cfg.min_area && c.approx.len() >= self.cfg.min_vertices)
            .map(|c| CropPolygon::new(to_float(&c.approx)))
            .collect();

        debug!(accepted = polys.len(), "Polygon candidates");
        polys
    }
}

fn to_float(points: &[Point2i]) -> Vec<Point2f> {
    points.iter().copied().map(Point2f::from).collect()
}
