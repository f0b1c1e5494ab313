//! # scanit-cropper - Document Boundary Detection
//!
//! Finds the outline of a document (receipt, page, card) in a photo so a
//! scanner app can crop to it. Built on the `image` and `imageproc` crates,
//! with an optional OpenCV backend.
//!
//! ## Modes
//!
//! - **Bounding box**: axis-aligned envelope of the best rectangle
//! - **Oriented box**: minimum-area rectangle at any rotation
//! - **Polygon**: free-form outline with four or more vertices
//!
//! Every mode returns a zero-area value when nothing qualifies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cropper::{CropperConfig, DocumentCropper};
//!
//! let cropper = DocumentCropper::new(CropperConfig::default())?;
//! let image = image::open("receipt.jpg")?;
//!
//! let bbox = cropper.crop_rect(&image)?;
//! if bbox.is_empty() {
//!     println!("no document found");
//! } else {
//!     println!("{:?}", bbox);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
mod contours;
mod det;
mod engine;
mod geometry;
mod image_impl;
mod postprocess;
mod preprocess;
mod types;

// FFI module for C bindings
#[cfg(feature = "ffi")]
pub mod ffi;

// Public API exports
pub use crate::det::{select_largest, BoundaryDetector};
pub use crate::engine::{CropError, ImageEngine, Result, TracedContour};
pub use crate::geometry::{bounding_box, BoundingBox, Candidate, CropPolygon, OrientedRect};
pub use crate::image_impl::{DefaultEngine, Point2f, Point2i, RustEngine, Size2f};
pub use crate::types::{CropperConfig, OutlineConfig, PolygonFilterConfig, RectFilterConfig};

#[cfg(feature = "use-opencv")]
pub use crate::image_impl::OpenCvEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which boundary shape to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    Rect,
    Box,
    Polygon,
}

/// Result of [`DocumentCropper::detect`], one variant per [`CropMode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "shape", rename_all = "lowercase")]
pub enum CropShape {
    Rect(BoundingBox),
    Box(OrientedRect),
    Polygon(CropPolygon),
}

impl CropShape {
    /// True when no document was found.
    pub fn is_empty(&self) -> bool {
        match self {
            CropShape::Rect(b) => b.is_empty(),
            CropShape::Box(r) => r.is_empty(),
            CropShape::Polygon(p) => p.area() <= 0.0,
        }
    }

    /// Axis-aligned envelope of any shape.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            CropShape::Rect(b) => *b,
            CropShape::Box(r) => r.bounding_box(),
            CropShape::Polygon(p) => p.bounding_box(),
        }
    }
}

/// Main document cropper interface
///
/// Holds no per-image state; one instance can serve any number of images,
/// from several threads when the engine allows it.
pub struct DocumentCropper<E: ImageEngine = DefaultEngine> {
    engine: E,
    config: CropperConfig,
}

impl DocumentCropper<DefaultEngine> {
    /// Create a cropper on the default engine
    pub fn new(config: CropperConfig) -> Result<Self> {
        Self::with_engine(DefaultEngine::default(), config)
    }
}

impl Default for DocumentCropper<DefaultEngine> {
    fn default() -> Self {
        Self {
            engine: DefaultEngine::default(),
            config: CropperConfig::default(),
        }
    }
}

impl<E: ImageEngine> DocumentCropper<E> {
    pub fn with_engine(engine: E, config: CropperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn detector(&self) -> BoundaryDetector<'_, E> {
        BoundaryDetector::new(&self.engine, &self.config)
    }

    /// Axis-aligned box around the largest near-rectangular outline.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn crop_rect(&self, image: &DynamicImage) -> Result<BoundingBox> {
        self.detector().bounding_box(image)
    }

    /// Minimum-area rotated rectangle around the largest near-rectangular outline.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn crop_box(&self, image: &DynamicImage) -> Result<OrientedRect> {
        self.detector().oriented_box(image)
    }

    /// Largest outline with at least four vertices, no angle constraint.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn crop_polygon(&self, image: &DynamicImage) -> Result<CropPolygon> {
        self.detector().polygon(image)
    }

    pub fn detect(&self, image: &DynamicImage, mode: CropMode) -> Result<CropShape> {
        Ok(match mode {
            CropMode::Rect => CropShape::Rect(self.crop_rect(image)?),
            CropMode::Box => CropShape::Box(self.crop_box(image)?),
            CropMode::Polygon => CropShape::Polygon(self.crop_polygon(image)?),
        })
    }

    /// Run [`Self::crop_rect`] on encoded image data in memory
    pub fn crop_rect_from_bytes(&self, data: &[u8]) -> Result<BoundingBox> {
        self.crop_rect(&image::load_from_memory(data)?)
    }

    pub fn crop_box_from_bytes(&self, data: &[u8]) -> Result<OrientedRect> {
        self.crop_box(&image::load_from_memory(data)?)
    }

    pub fn crop_polygon_from_bytes(&self, data: &[u8]) -> Result<CropPolygon> {
        self.crop_polygon(&image::load_from_memory(data)?)
    }
}
