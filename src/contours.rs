// Contour collection: trace outlines in the edge map and simplify each one

use image::GrayImage;
use tracing::{debug, instrument};

use crate::engine::{ImageEngine, Result, TracedContour};
use crate::image_impl::Point2i;

/// A traced outline together with its measurements and simplified polygon.
#[derive(Debug, Clone, Default)]
pub struct ContourCandidate {
    /// Raw enclosed area of the traced contour.
    pub area: f64,
    /// Closed perimeter of the traced contour.
    pub perimeter: f64,
    /// Polygon approximation within `factor * perimeter` of the contour.
    pub approx: Vec<Point2i>,
}

impl ContourCandidate {
    pub fn new(area: f64, perimeter: f64, approx: Vec<Point2i>) -> Self {
        Self { area, perimeter, approx }
    }
}

/// Walk the sibling chain starting at the first contour.
pub fn traverse(contours: &[TracedContour]) -> impl Iterator<Item = &TracedContour> {
    let mut cursor = if contours.is_empty() { None } else { Some(0) };
    let mut visited = 0usize;

    std::iter::from_fn(move || {
        let idx = cursor?;
        // A malformed chain cannot loop forever
        if idx >= contours.len() || visited >= contours.len() {
            return None;
        }
        visited += 1;
        cursor = contours[idx].next;
        Some(&contours[idx])
    })
}

/// Trace every outline of `edge_map` and approximate each with a tolerance
/// proportional to its own perimeter.
#[instrument(skip(engine, edge_map))]
pub fn collect_contours<E: ImageEngine>(
    engine: &E,
    edge_map: &GrayImage,
    approximation_factor: f64,
) -> Result<Vec<ContourCandidate>> {
    let contours = engine.find_contours(edge_map)?;

    let mut out = Vec::with_capacity(contours.len());
    for contour in traverse(&contours) {
        let area = engine.contour_area(&contour.points);
        let perimeter = engine.arc_length(&contour.points);
        let approx = engine.approx_poly(&contour.points, perimeter * approximation_factor)?;
        out.push(ContourCandidate::new(area, perimeter, approx));
    }

    debug!(traced = contours.len(), collected = out.len(), "Contours collected");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_impl::RustEngine;
    use image::Luma;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    fn contour(next: Option<usize>) -> TracedContour {
        TracedContour {
            points: vec![Point2i::new(0, 0)],
            parent: None,
            next,
        }
    }

    #[test]
    fn test_traverse_follows_next_links() {
        let contours = vec![contour(Some(2)), contour(None), contour(None)];
        let visited: Vec<*const TracedContour> = traverse(&contours).map(|c| c as *const _).collect();
        assert_eq!(visited, vec![&contours[0] as *const _, &contours[2] as *const _]);
    }

    #[test]
    fn test_traverse_stops_on_cycle() {
        let contours = vec![contour(Some(1)), contour(Some(0))];
        assert_eq!(traverse(&contours).count(), 2);
        assert_eq!(traverse(&[]).count(), 0);
    }

    #[test]
    fn test_empty_edge_map_yields_nothing() {
        let edge_map = GrayImage::new(50, 50);
        let out = collect_contours(&RustEngine, &edge_map, 0.05).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_outline_ring_gives_outer_and_inner_quads() {
        let mut edge_map = GrayImage::new(100, 80);
        draw_hollow_rect_mut(&mut edge_map, Rect::at(20, 15).of_size(60, 40), Luma([255]));

        let out = collect_contours(&RustEngine, &edge_map, 0.05).unwrap();
        assert_eq!(out.len(), 2, "outer border and hole border");
        for c in &out {
            assert_eq!(c.approx.len(), 4, "{:?}", c.approx);
            assert!(c.area > 2000.0 && c.area < 2500.0, "area {}", c.area);
            assert!(c.perimeter > 180.0 && c.perimeter < 210.0, "perimeter {}", c.perimeter);
        }
    }

    #[test]
    fn test_fine_factor_never_increases_vertices() {
        let mut edge_map = GrayImage::new(100, 80);
        draw_hollow_rect_mut(&mut edge_map, Rect::at(10, 10).of_size(50, 30), Luma([255]));

        let engine = RustEngine;
        let traced = engine.find_contours(&edge_map).unwrap();
        let out = collect_contours(&engine, &edge_map, 0.015).unwrap();
        for (c, t) in out.iter().zip(traced.iter()) {
            assert!(c.approx.len() <= t.points.len());
            assert!(c.approx.len() >= 4);
        }
    }
}
