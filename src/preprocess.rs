use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::{debug, instrument};

use crate::engine::{CropError, ImageEngine, Result};
use crate::types::OutlineConfig;

/// Turns a photographed page into a cleaned binary edge map.
pub struct OutlinePreProcess<'a, E: ImageEngine> {
    pub engine: &'a E,
    pub cfg: &'a OutlineConfig,
}

impl<'a, E: ImageEngine> OutlinePreProcess<'a, E> {
    pub fn new(engine: &'a E, cfg: &'a OutlineConfig) -> Self {
        Self { engine, cfg }
    }

    /// Grayscale, pyramid smoothing, Canny, then dilate/erode to close gaps.
    ///
    /// Every intermediate is dropped as soon as the next stage has consumed
    /// it; only the eroded edge map is returned.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn run(&self, image: &DynamicImage) -> Result<GrayImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(CropError::InvalidInput(format!("image has zero dimension ({}x{})", w, h)));
        }

        let gray = self.engine.to_gray(image)?;
        let smoothed = self.engine.pyr_smooth(&gray)?;
        drop(gray);

        let edges = self.engine.canny(&smoothed, self.cfg.canny_low, self.cfg.canny_high)?;
        drop(smoothed);

        let dilated = self.engine.dilate(&edges, self.cfg.dilate_iterations)?;
        drop(edges);

        let eroded = self.engine.erode(&dilated, self.cfg.erode_iterations)?;
        drop(dilated);

        debug!(
            edge_pixels = eroded.pixels().filter(|p| p[0] > 0).count(),
            "Outline extracted"
        );
        Ok(eroded)
    }
}
