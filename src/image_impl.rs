//! Image engine implementations: pure Rust (default) and OpenCV backends

#[cfg(feature = "use-opencv")]
pub use opencv_impl::OpenCvEngine;

pub use rust_impl::RustEngine;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::engine::{CropError, Result};
use crate::geometry::OrientedRect;

/// Engine used by [`crate::DocumentCropper::default`].
#[cfg(not(feature = "use-opencv"))]
pub type DefaultEngine = RustEngine;

#[cfg(feature = "use-opencv")]
pub type DefaultEngine = OpenCvEngine;

// Common types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point2i {
    pub x: i32,
    pub y: i32,
}

impl Point2i {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point2i> for Point2f {
    fn from(p: Point2i) -> Self {
        Point2f::new(p.x as f32, p.y as f32)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size2f {
    pub width: f32,
    pub height: f32,
}

impl Size2f {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Minimum-area enclosing rectangle via rotating calipers over the convex hull.
///
/// The returned angle is normalised into (-45, 45] degrees, swapping width and
/// height when the winning edge is closer to vertical.
pub fn min_area_rect(points: &[Point2f]) -> Result<OrientedRect> {
    if points.is_empty() {
        return Err(CropError::ImageProcessing("Empty point set".to_string()));
    }

    if points.len() == 1 {
        return Ok(OrientedRect::new(points[0], Size2f::default(), 0.0));
    }

    let hull = convex_hull(points);

    if hull.len() < 3 {
        // Collinear input: fall back to the segment through the extremes
        let (a, b) = farthest_pair(&hull);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let center = Point2f::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        let angle = dy.atan2(dx).to_degrees();
        return Ok(normalise(center, dx.hypot(dy), 0.0, angle));
    }

    let mut min_area = f32::MAX;
    let mut best_rect = None;

    let n = hull.len();
    for i in 0..n {
        let p1 = hull[i];
        let p2 = hull[(i + 1) % n];

        let edge_x = p2.x - p1.x;
        let edge_y = p2.y - p1.y;
        let edge_len = edge_x.hypot(edge_y);

        if edge_len < 1e-6 {
            continue;
        }

        // Edge direction and its perpendicular
        let ux = edge_x / edge_len;
        let uy = edge_y / edge_len;
        let vx = -uy;
        let vy = ux;

        let mut min_u = f32::MAX;
        let mut max_u = f32::MIN;
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;

        for pt in &hull {
            let u = pt.x * ux + pt.y * uy;
            let v = pt.x * vx + pt.y * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;

        if area < min_area {
            min_area = area;

            let center_u = (min_u + max_u) / 2.0;
            let center_v = (min_v + max_v) / 2.0;
            let center = Point2f::new(
                center_u * ux + center_v * vx,
                center_u * uy + center_v * vy,
            );

            best_rect = Some(normalise(center, width, height, uy.atan2(ux).to_degrees()));
        }
    }

    best_rect.ok_or_else(|| {
        CropError::ImageProcessing("Failed to compute minimum area rectangle".to_string())
    })
}

fn normalise(center: Point2f, width: f32, height: f32, angle: f32) -> OrientedRect {
    let (mut width, mut height, mut angle) = (width, height, angle);
    while angle > 45.0 {
        angle -= 90.0;
        std::mem::swap(&mut width, &mut height);
    }
    while angle <= -45.0 {
        angle += 90.0;
        std::mem::swap(&mut width, &mut height);
    }
    OrientedRect::new(center, Size2f::new(width, height), angle)
}

fn farthest_pair(points: &[Point2f]) -> (Point2f, Point2f) {
    let mut best = (points[0], points[0]);
    let mut best_d = -1.0f32;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i..] {
            let d = (b.x - a.x).hypot(b.y - a.y);
            if d > best_d {
                best_d = d;
                best = (*a, *b);
            }
        }
    }
    best
}

/// Convex hull using Andrew's monotone chain, counter-clockwise in y-up terms
fn convex_hull(points: &[Point2f]) -> Vec<Point2f> {
    let mut pts: Vec<Point2f> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point2f, a: Point2f, b: Point2f| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2f> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2f> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Corners of an oriented rectangle, starting from the (-w/2, -h/2) corner.
pub fn box_points(center: Point2f, size: Size2f, angle: f32) -> [Point2f; 4] {
    let rotation = Rotation2::new(angle.to_radians());

    let w = size.width / 2.0;
    let h = size.height / 2.0;

    let corners = [(-w, -h), (w, -h), (w, h), (-w, h)];

    corners.map(|(dx, dy)| {
        let offset = rotation * Vector2::new(dx, dy);
        Point2f::new(center.x + offset.x, center.y + offset.y)
    })
}

// Pure Rust implementation
mod rust_impl {
    use super::{min_area_rect, Point2f, Point2i};
    use crate::engine::{ImageEngine, Result, TracedContour};
    use crate::geometry::OrientedRect;
    use image::imageops::{self, FilterType};
    use image::{DynamicImage, GrayImage};
    use imageproc::distance_transform::Norm;
    use imageproc::filter::gaussian_blur_f32;
    use imageproc::geometry::approximate_polygon_dp;
    use imageproc::point::Point;

    /// Sigma of the Gaussian standing in for the 5-tap pyramid kernel.
    const PYR_SIGMA: f32 = 1.0;

    /// Engine over the `image` and `imageproc` crates.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RustEngine;

    impl ImageEngine for RustEngine {
        fn to_gray(&self, image: &DynamicImage) -> Result<GrayImage> {
            Ok(image.to_luma8())
        }

        fn pyr_smooth(&self, gray: &GrayImage) -> Result<GrayImage> {
            let (w, h) = gray.dimensions();

            let blurred = gaussian_blur_f32(gray, PYR_SIGMA);
            let reduced = imageops::resize(&blurred, w.div_ceil(2), h.div_ceil(2), FilterType::Nearest);
            drop(blurred);

            let expanded = imageops::resize(&reduced, w, h, FilterType::Triangle);
            drop(reduced);

            Ok(gaussian_blur_f32(&expanded, PYR_SIGMA))
        }

        fn canny(&self, gray: &GrayImage, low: f32, high: f32) -> Result<GrayImage> {
            Ok(imageproc::edges::canny(gray, low, high))
        }

        fn dilate(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage> {
            // Chessboard radius k equals k passes of a 3x3 square
            Ok(imageproc::morphology::dilate(binary, Norm::LInf, iterations))
        }

        fn erode(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage> {
            Ok(imageproc::morphology::erode(binary, Norm::LInf, iterations))
        }

        fn find_contours(&self, binary: &GrayImage) -> Result<Vec<TracedContour>> {
            let raw = imageproc::contours::find_contours::<i32>(binary);
            let count = raw.len();

            // Flat list: every contour is the sibling of the one before it
            Ok(raw
                .into_iter()
                .enumerate()
                .map(|(i, c)| TracedContour {
                    points: c.points.iter().map(|p| Point2i::new(p.x, p.y)).collect(),
                    parent: c.parent,
                    next: (i + 1 < count).then_some(i + 1),
                })
                .collect())
        }

        fn approx_poly(&self, points: &[Point2i], epsilon: f64) -> Result<Vec<Point2i>> {
            Ok(approx_closed(points, epsilon))
        }

        fn min_area_rect(&self, points: &[Point2f]) -> Result<OrientedRect> {
            min_area_rect(points)
        }

        fn arc_length(&self, points: &[Point2i]) -> f64 {
            let curve: Vec<Point<i32>> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
            imageproc::geometry::arc_length(&curve, true)
        }
    }

    /// Douglas-Peucker over a closed curve.
    ///
    /// The ring is split at the point farthest from the start so that both
    /// halves are open curves; the start vertex is dropped afterwards when it
    /// lies within `epsilon` of the chord through its neighbours.
    fn approx_closed(points: &[Point2i], epsilon: f64) -> Vec<Point2i> {
        if points.len() < 3 || epsilon <= 0.0 {
            return points.to_vec();
        }

        let curve: Vec<Point<i32>> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
        let start = curve[0];

        let far = curve
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| {
                let dx = (p.x - start.x) as i64;
                let dy = (p.y - start.y) as i64;
                dx * dx + dy * dy
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        if far == 0 {
            return vec![points[0]];
        }

        let first = approximate_polygon_dp(&curve[..=far], epsilon, false);

        let mut tail: Vec<Point<i32>> = curve[far..].to_vec();
        tail.push(start);
        let second = approximate_polygon_dp(&tail, epsilon, false);

        let mut result: Vec<Point2i> = first.iter().map(|p| Point2i::new(p.x, p.y)).collect();
        if second.len() > 2 {
            result.extend(second[1..second.len() - 1].iter().map(|p| Point2i::new(p.x, p.y)));
        }

        if result.len() > 3 {
            let n = result.len();
            if distance_to_line(result[0], result[n - 1], result[1]) <= epsilon {
                result.remove(0);
            }
        }

        result
    }

    fn distance_to_line(p: Point2i, a: Point2i, b: Point2i) -> f64 {
        let (px, py) = (p.x as f64, p.y as f64);
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        let len = (bx - ax).hypot(by - ay);
        if len == 0.0 {
            return (px - ax).hypot(py - ay);
        }
        ((bx - ax) * (ay - py) - (ax - px) * (by - ay)).abs() / len
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use image::Luma;

        fn ring(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point2i> {
            // Pixel border of the rectangle, clockwise from the top-left corner
            let mut pts = Vec::new();
            for x in x0..x1 {
                pts.push(Point2i::new(x, y0));
            }
            for y in y0..y1 {
                pts.push(Point2i::new(x1, y));
            }
            for x in (x0 + 1..=x1).rev() {
                pts.push(Point2i::new(x, y1));
            }
            for y in (y0 + 1..=y1).rev() {
                pts.push(Point2i::new(x0, y));
            }
            pts
        }

        #[test]
        fn test_approx_closed_rectangle_has_four_corners() {
            let pts = ring(10, 10, 60, 40);
            let approx = approx_closed(&pts, 0.05 * 160.0);
            assert_eq!(approx.len(), 4, "got {:?}", approx);
            assert!(approx.contains(&Point2i::new(10, 10)));
            assert!(approx.contains(&Point2i::new(60, 10)));
            assert!(approx.contains(&Point2i::new(60, 40)));
            assert!(approx.contains(&Point2i::new(10, 40)));
        }

        #[test]
        fn test_approx_closed_drops_collinear_start() {
            // Start in the middle of the top edge
            let mut pts = ring(0, 0, 40, 40);
            pts.rotate_left(20);
            let approx = approx_closed(&pts, 2.0);
            assert_eq!(approx.len(), 4, "got {:?}", approx);
            assert!(!approx.contains(&Point2i::new(20, 0)));
        }

        #[test]
        fn test_approx_never_adds_vertices() {
            let pts = vec![Point2i::new(0, 0), Point2i::new(5, 0), Point2i::new(5, 5)];
            assert_eq!(approx_closed(&pts, 1.0).len(), 3);
            assert_eq!(approx_closed(&pts[..2], 1.0).len(), 2);
            assert_eq!(approx_closed(&pts, 0.0), pts);
        }

        #[test]
        fn test_find_contours_links_siblings() {
            let mut img = GrayImage::new(40, 20);
            for y in 2..8 {
                for x in 2..8 {
                    img.put_pixel(x, y, Luma([255]));
                }
                for x in 20..30 {
                    img.put_pixel(x, y, Luma([255]));
                }
            }

            let contours = RustEngine.find_contours(&img).unwrap();
            assert_eq!(contours.len(), 2);
            assert_eq!(contours[0].next, Some(1));
            assert_eq!(contours[1].next, None);
        }

        #[test]
        fn test_find_contours_empty_image() {
            let img = GrayImage::new(16, 16);
            assert!(RustEngine.find_contours(&img).unwrap().is_empty());
        }

        #[test]
        fn test_pyr_smooth_keeps_dimensions() {
            for (w, h) in [(31, 17), (32, 32), (3, 5)] {
                let img = GrayImage::from_pixel(w, h, Luma([90]));
                let out = RustEngine.pyr_smooth(&img).unwrap();
                assert_eq!(out.dimensions(), (w, h));
            }
        }

        #[test]
        fn test_dilate_then_erode_closes_single_pixel_gap() {
            let mut img = GrayImage::new(20, 5);
            for x in 2..18 {
                if x != 10 {
                    img.put_pixel(x, 2, Luma([255]));
                }
            }
            let dilated = RustEngine.dilate(&img, 1).unwrap();
            let closed = RustEngine.erode(&dilated, 1).unwrap();
            assert_eq!(closed.get_pixel(10, 2)[0], 255);
        }
    }
}

// OpenCV implementation
#[cfg(feature = "use-opencv")]
mod opencv_impl {
    use super::{normalise, Point2f, Point2i};
    use crate::engine::{CropError, ImageEngine, Result, TracedContour};
    use crate::geometry::OrientedRect;
    use image::{DynamicImage, GrayImage};
    use opencv::core::{self, Mat, Vector};
    use opencv::imgproc;
    use opencv::prelude::*;

    /// Engine over OpenCV's imgproc module.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct OpenCvEngine;

    fn gray_to_mat(img: &GrayImage) -> Result<Mat> {
        let (_, h) = img.dimensions();
        let flat = Mat::from_slice(img.as_raw())?;
        let mat = flat.reshape(1, h as i32)?;
        Ok(mat.try_clone()?)
    }

    fn mat_to_gray(mat: &Mat) -> Result<GrayImage> {
        let bytes = mat.data_bytes()?.to_vec();
        GrayImage::from_raw(mat.cols() as u32, mat.rows() as u32, bytes)
            .ok_or_else(|| CropError::ImageProcessing("Mat is not a continuous 8-bit image".to_string()))
    }

    fn to_cv_points(points: &[Point2i]) -> Vector<core::Point> {
        points.iter().map(|p| core::Point::new(p.x, p.y)).collect()
    }

    fn morph(src: &GrayImage, iterations: u8, dilate: bool) -> Result<GrayImage> {
        let src = gray_to_mat(src)?;
        let kernel = imgproc::get_structuring_element_def(imgproc::MORPH_RECT, core::Size::new(3, 3))?;
        let border = imgproc::morphology_default_border_value()?;
        let mut dst = Mat::default();
        if dilate {
            imgproc::dilate(&src, &mut dst, &kernel, core::Point::new(-1, -1), iterations as i32, core::BORDER_CONSTANT, border)?;
        } else {
            imgproc::erode(&src, &mut dst, &kernel, core::Point::new(-1, -1), iterations as i32, core::BORDER_CONSTANT, border)?;
        }
        mat_to_gray(&dst)
    }

    impl ImageEngine for OpenCvEngine {
        fn to_gray(&self, image: &DynamicImage) -> Result<GrayImage> {
            let rgb = image.to_rgb8();
            let (_, h) = rgb.dimensions();
            let flat = Mat::from_slice(rgb.as_raw())?;
            let src = flat.reshape(3, h as i32)?;
            let mut gray = Mat::default();
            imgproc::cvt_color_def(&*src, &mut gray, imgproc::COLOR_RGB2GRAY)?;
            mat_to_gray(&gray)
        }

        fn pyr_smooth(&self, gray: &GrayImage) -> Result<GrayImage> {
            let (w, h) = gray.dimensions();
            let src = gray_to_mat(gray)?;
            let mut reduced = Mat::default();
            imgproc::pyr_down_def(&src, &mut reduced)?;
            drop(src);
            let mut expanded = Mat::default();
            imgproc::pyr_up(&reduced, &mut expanded, core::Size::new(w as i32, h as i32), core::BORDER_DEFAULT)?;
            mat_to_gray(&expanded)
        }

        fn canny(&self, gray: &GrayImage, low: f32, high: f32) -> Result<GrayImage> {
            let src = gray_to_mat(gray)?;
            let mut edges = Mat::default();
            imgproc::canny_def(&src, &mut edges, low as f64, high as f64)?;
            mat_to_gray(&edges)
        }

        fn dilate(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage> {
            morph(binary, iterations, true)
        }

        fn erode(&self, binary: &GrayImage, iterations: u8) -> Result<GrayImage> {
            morph(binary, iterations, false)
        }

        fn find_contours(&self, binary: &GrayImage) -> Result<Vec<TracedContour>> {
            let src = gray_to_mat(binary)?;
            let mut contours = Vector::<Vector<core::Point>>::new();
            let mut hierarchy = Vector::<core::Vec4i>::new();
            imgproc::find_contours_with_hierarchy(
                &src,
                &mut contours,
                &mut hierarchy,
                imgproc::RETR_LIST,
                imgproc::CHAIN_APPROX_SIMPLE,
                core::Point::new(0, 0),
            )?;

            // hierarchy entries are [next, previous, first_child, parent]
            let link = |v: i32| (v >= 0).then_some(v as usize);
            Ok(contours
                .iter()
                .zip(hierarchy.iter())
                .map(|(c, h)| TracedContour {
                    points: c.iter().map(|p| Point2i::new(p.x, p.y)).collect(),
                    parent: link(h[3]),
                    next: link(h[0]),
                })
                .collect())
        }

        fn approx_poly(&self, points: &[Point2i], epsilon: f64) -> Result<Vec<Point2i>> {
            if points.len() < 3 || epsilon <= 0.0 {
                return Ok(points.to_vec());
            }
            let curve = to_cv_points(points);
            let mut approx = Vector::<core::Point>::new();
            imgproc::approx_poly_dp(&curve, &mut approx, epsilon, true)?;
            Ok(approx.iter().map(|p| Point2i::new(p.x, p.y)).collect())
        }

        fn min_area_rect(&self, points: &[Point2f]) -> Result<OrientedRect> {
            let cv_points: Vector<core::Point2f> =
                points.iter().map(|p| core::Point2f::new(p.x, p.y)).collect();
            let rect = imgproc::min_area_rect(&cv_points)?;
            // OpenCV 4.5+ reports [0, 90); bring it in line with the Rust engine
            Ok(normalise(
                Point2f::new(rect.center.x, rect.center.y),
                rect.size.width,
                rect.size.height,
                rect.angle,
            ))
        }
    }
}
