use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::contours::collect_contours;
use crate::engine::{ImageEngine, Result};
use crate::geometry::{BoundingBox, Candidate, CropPolygon, OrientedRect};
use crate::postprocess::{PolygonFilter, RectFilter};
use crate::preprocess::OutlinePreProcess;
use crate::types::CropperConfig;

/// Largest candidate by area; the first one wins a tie.
///
/// Starts from a zero running maximum, so an empty slice or one holding only
/// zero-area candidates yields `C::default()`.
pub fn select_largest<C: Candidate>(candidates: &[C]) -> C {
    let mut best = C::default();
    let mut max_area = 0.0f64;

    for c in candidates {
        let area = c.area();
        if area > max_area {
            max_area = area;
            best = c.clone();
        }
    }

    best
}

/// Runs outline extraction, contour collection, filtering and selection for
/// one image.
pub struct BoundaryDetector<'a, E: ImageEngine> {
    pub engine: &'a E,
    pub cfg: &'a CropperConfig,
}

impl<'a, E: ImageEngine> BoundaryDetector<'a, E> {
    pub fn new(engine: &'a E, cfg: &'a CropperConfig) -> Self {
        Self { engine, cfg }
    }

    fn edge_map(&self, image: &DynamicImage) -> Result<GrayImage> {
        OutlinePreProcess::new(self.engine, &self.cfg.outline).run(image)
    }

    /// Largest near-rectangular quadrilateral as a minimum-area rectangle.
    #[instrument(skip_all)]
    pub fn oriented_box(&self, image: &DynamicImage) -> Result<OrientedRect> {
        let start = Instant::now();

        let edges = self.edge_map(image)?;
        let candidates = collect_contours(self.engine, &edges, self.cfg.rect.approx_factor)?;
        drop(edges);

        let rects = RectFilter::new(&self.cfg.rect).apply(self.engine, &candidates)?;
        let best = select_largest(&rects);

        debug!(
            area = best.area(),
            angle = best.angle,
            elapse = start.elapsed().as_secs_f64(),
            "Oriented box selected"
        );
        Ok(best)
    }

    /// Axis-aligned envelope of [`Self::oriented_box`].
    #[instrument(skip_all)]
    pub fn bounding_box(&self, image: &DynamicImage) -> Result<BoundingBox> {
        let rect = self.oriented_box(image)?;
        Ok(rect.bounding_box())
    }

    /// Largest polygon with at least the configured number of vertices.
    #[instrument(skip_all)]
    pub fn polygon(&self, image: &DynamicImage) -> Result<CropPolygon> {
        let start = Instant::now();

        let edges = self.edge_map(image)?;
        let candidates = collect_contours(self.engine, &edges, self.cfg.polygon.approx_factor)?;
        drop(edges);

        let polys = PolygonFilter::new(&self.cfg.polygon).apply(&candidates);
        let best = select_largest(&polys);

        debug!(
            area = best.area(),
            vertices = best.len(),
            elapse = start.elapsed().as_secs_f64(),
            "Polygon selected"
        );
        Ok(best)
    }
}
