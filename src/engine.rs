use image::{DynamicImage, GrayImage};

use crate::image_impl::{Point2f, Point2i};
use crate::geometry::OrientedRect;

#[derive(thiserror::Error, Debug)]
pub enum CropError {
    #[error("Invalid input image: {0}")]
    InvalidInput(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "use-opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CropError>;

/// One closed outline produced by [`ImageEngine::find_contours`].
///
/// `next` links to the following contour at the same nesting level; the
/// collector walks this chain starting from the first contour.
#[derive(Debug, Clone, Default)]
pub struct TracedContour {
    pub points: Vec<Point2i>,
    pub parent: Option<usize>,
    pub next: Option<usize>,
}

impl TracedContour {
    pub fn new(points: Vec<Point2i>) -> Self {
        Self {
            points,
            parent: None,
            next: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The image-processing primitives the boundary detector is built on.
///
/// Areas and perimeters are in pixel units, angles in degrees and the
/// approximation tolerance is an absolute distance in pixels.
pub trait ImageEngine {
    /// Single channel intensity image.
    fn to_gray(&self, image: &DynamicImage) -> Result<GrayImage>;

    /// Pyramid reduce followed by expand back to the input dimensions.
    fn pyr_smooth(&self, gray: &GrayImage) -> Result<GrayImage>;

    fn canny(&self, gray: &GrayImage, low: f32, high: f32) -> Result<GrayImage>;

    /// 3x3 dilation applied `iterations` times.
    fn dilate(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage>;

    /// 3x3 erosion applied `iterations` times.
    fn erode(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage>;

    /// All outer and hole borders of the non-zero regions, sibling-linked.
    fn find_contours(&self, binary: &GrayImage) -> Result<Vec<TracedContour>>;

    /// Closed polygon approximation within `epsilon` pixels of the contour.
    fn approx_poly(&self, points: &[Point2i], epsilon: f64) -> Result<Vec<Point2i>>;

    fn min_area_rect(&self, points: &[Point2f]) -> Result<OrientedRect>;

    /// Enclosed area of a closed contour, always non-negative.
    fn contour_area(&self, points: &[Point2i]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }

        let n = points.len();
        let mut area = 0.0f64;
        for i in 0..n {
            let j = (i + 1) % n;
            area += points[i].x as f64 * points[j].y as f64
                - points[j].x as f64 * points[i].y as f64;
        }
        (area * 0.5).abs()
    }

    /// Length of the closed curve through `points`.
    fn arc_length(&self, points: &[Point2i]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }

        let n = points.len();
        (0..n)
            .map(|i| {
                let a = points[i];
                let b = points[(i + 1) % n];
                ((b.x - a.x) as f64).hypot((b.y - a.y) as f64)
            })
            .sum()
    }
}
