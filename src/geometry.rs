use serde::{Deserialize, Serialize};

use crate::image_impl::{box_points, Point2f, Size2f};

/// Anything the selector can rank by enclosed area.
pub trait Candidate: Default + Clone {
    fn area(&self) -> f64;
}

/// Axis-aligned envelope, in pixel coordinates of the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// True for the "no document detected" result.
    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn contains(&self, p: Point2f) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Minimum-area rectangle at any rotation. `angle` is in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    pub center: Point2f,
    pub size: Size2f,
    pub angle: f32,
}

impl OrientedRect {
    pub fn new(center: Point2f, size: Size2f, angle: f32) -> Self {
        Self { center, size, angle }
    }

    pub fn area(&self) -> f32 {
        self.size.width * self.size.height
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn vertices(&self) -> [Point2f; 4] {
        box_points(self.center, self.size, self.angle)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        bounding_box(&self.vertices())
    }
}

impl Candidate for OrientedRect {
    fn area(&self) -> f64 {
        OrientedRect::area(self) as f64
    }
}

/// Free-form closed polygon, vertices in approximation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropPolygon {
    pub vertices: Vec<Point2f>,
}

impl CropPolygon {
    pub fn new(vertices: Vec<Point2f>) -> Self {
        Self { vertices }
    }

    /// Shoelace area, independent of winding direction.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }

        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
            })
            .sum();
        (twice * 0.5).abs()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        bounding_box(&self.vertices)
    }
}

impl Candidate for CropPolygon {
    fn area(&self) -> f64 {
        CropPolygon::area(self)
    }
}

/// Axis-aligned envelope of `vertices`; the zero box for an empty slice.
pub fn bounding_box(vertices: &[Point2f]) -> BoundingBox {
    let Some(first) = vertices.first() else {
        return BoundingBox::default();
    };

    vertices.iter().skip(1).fold(
        BoundingBox::new(first.x, first.y, first.x, first.y),
        |b, p| BoundingBox {
            left: b.left.min(p.x),
            top: b.top.min(p.y),
            right: b.right.max(p.x),
            bottom: b.bottom.max(p.y),
        },
    )
}
