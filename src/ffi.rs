// FFI bindings for C/C++/Swift/Kotlin hosts
use std::os::raw::{c_char, c_float, c_int};
use std::slice;

use image::{DynamicImage, RgbaImage};

use crate::{DocumentCropper, Point2f};

/// Opaque handle to a DocumentCropper instance
pub struct SCNHandle {
    inner: DocumentCropper,
}

/// C-compatible axis-aligned box
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct CBoundingBox {
    pub left: c_float,
    pub top: c_float,
    pub right: c_float,
    pub bottom: c_float,
}

/// C-compatible rotated rectangle, angle in degrees
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct COrientedRect {
    pub center_x: c_float,
    pub center_y: c_float,
    pub width: c_float,
    pub height: c_float,
    pub angle: c_float,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct CPoint {
    pub x: c_float,
    pub y: c_float,
}

const SCN_OK: c_int = 0;
const SCN_NULL_POINTER: c_int = -1;
const SCN_INVALID_IMAGE: c_int = -2;
const SCN_PIPELINE_ERROR: c_int = -3;

/// Create a new cropper with default parameters
#[no_mangle]
pub extern "C" fn scn_cropper_new() -> *mut SCNHandle {
    Box::into_raw(Box::new(SCNHandle {
        inner: DocumentCropper::default(),
    }))
}

/// Free a cropper instance
///
/// # Safety
/// handle must be a valid pointer returned from scn_cropper_new
#[no_mangle]
pub unsafe extern "C" fn scn_cropper_free(handle: *mut SCNHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Copy a tightly packed RGBA8 buffer into an owned image.
unsafe fn rgba_image(pixels: *const u8, width: u32, height: u32) -> Result<DynamicImage, c_int> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(SCN_INVALID_IMAGE)?;
    if len == 0 {
        return Err(SCN_INVALID_IMAGE);
    }

    let data = slice::from_raw_parts(pixels, len).to_vec();
    RgbaImage::from_raw(width, height, data)
        .map(DynamicImage::ImageRgba8)
        .ok_or(SCN_INVALID_IMAGE)
}

/// Axis-aligned document box of an RGBA8 image
///
/// # Safety
/// - handle must be a valid pointer returned from scn_cropper_new
/// - pixels must point to width * height * 4 readable bytes
/// - out must point to writable CBoundingBox
#[no_mangle]
pub unsafe extern "C" fn scn_crop_rect_rgba(
    handle: *const SCNHandle,
    pixels: *const u8,
    width: u32,
    height: u32,
    out: *mut CBoundingBox,
) -> c_int {
    if handle.is_null() || pixels.is_null() || out.is_null() {
        return SCN_NULL_POINTER;
    }

    let img = match rgba_image(pixels, width, height) {
        Ok(img) => img,
        Err(code) => return code,
    };

    match (*handle).inner.crop_rect(&img) {
        Ok(b) => {
            *out = CBoundingBox {
                left: b.left,
                top: b.top,
                right: b.right,
                bottom: b.bottom,
            };
            SCN_OK
        }
        Err(_) => SCN_PIPELINE_ERROR,
    }
}

/// Rotated document rectangle of an RGBA8 image
///
/// # Safety
/// Same requirements as scn_crop_rect_rgba, with out pointing to COrientedRect
#[no_mangle]
pub unsafe extern "C" fn scn_crop_box_rgba(
    handle: *const SCNHandle,
    pixels: *const u8,
    width: u32,
    height: u32,
    out: *mut COrientedRect,
) -> c_int {
    if handle.is_null() || pixels.is_null() || out.is_null() {
        return SCN_NULL_POINTER;
    }

    let img = match rgba_image(pixels, width, height) {
        Ok(img) => img,
        Err(code) => return code,
    };

    match (*handle).inner.crop_box(&img) {
        Ok(r) => {
            *out = COrientedRect {
                center_x: r.center.x,
                center_y: r.center.y,
                width: r.size.width,
                height: r.size.height,
                angle: r.angle,
            };
            SCN_OK
        }
        Err(_) => SCN_PIPELINE_ERROR,
    }
}

/// Document polygon of an RGBA8 image
///
/// An empty result sets `*out_points` to null and `*out_count` to 0.
///
/// # Safety
/// - handle and pixels as for scn_crop_rect_rgba
/// - out_points will be allocated and must be freed with scn_free_points
#[no_mangle]
pub unsafe extern "C" fn scn_crop_polygon_rgba(
    handle: *const SCNHandle,
    pixels: *const u8,
    width: u32,
    height: u32,
    out_points: *mut *mut CPoint,
    out_count: *mut usize,
) -> c_int {
    if handle.is_null() || pixels.is_null() || out_points.is_null() || out_count.is_null() {
        return SCN_NULL_POINTER;
    }

    let img = match rgba_image(pixels, width, height) {
        Ok(img) => img,
        Err(code) => return code,
    };

    let poly = match (*handle).inner.crop_polygon(&img) {
        Ok(p) => p,
        Err(_) => return SCN_PIPELINE_ERROR,
    };

    if poly.is_empty() {
        *out_points = std::ptr::null_mut();
        *out_count = 0;
        return SCN_OK;
    }

    let points = points_to_c(&poly.vertices).into_boxed_slice();
    *out_count = points.len();
    *out_points = Box::into_raw(points) as *mut CPoint;

    SCN_OK
}

/// Free points returned from scn_crop_polygon_rgba
///
/// # Safety
/// - points must be a pointer returned from scn_crop_polygon_rgba
/// - count must match the count returned alongside it
#[no_mangle]
pub unsafe extern "C" fn scn_free_points(points: *mut CPoint, count: usize) {
    if points.is_null() {
        return;
    }

    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(points, count)));
}

/// Get library version
#[no_mangle]
pub extern "C" fn scn_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

fn points_to_c(points: &[Point2f]) -> Vec<CPoint> {
    points.iter().map(|p| CPoint { x: p.x, y: p.y }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn card_rgba() -> Vec<u8> {
        let (w, h) = (160u32, 120u32);
        let mut buf = vec![0u8; (w * h * 4) as usize];
        for y in 0..h {
            for x in 0..w {
                let inside = (30..130).contains(&x) && (25..95).contains(&y);
                let v = if inside { 240 } else { 20 };
                let i = ((y * w + x) * 4) as usize;
                buf[i..i + 4].copy_from_slice(&[v, v, v, 255]);
            }
        }
        buf
    }

    #[test]
    fn test_rect_roundtrip_through_c_abi() {
        let handle = scn_cropper_new();
        let pixels = card_rgba();
        let mut out = CBoundingBox::default();

        let code = unsafe { scn_crop_rect_rgba(handle, pixels.as_ptr(), 160, 120, &mut out) };
        assert_eq!(code, SCN_OK);
        assert!(out.left < out.right && out.top < out.bottom);
        assert!((out.left - 30.0).abs() < 5.0);

        unsafe { scn_cropper_free(handle) };
    }

    #[test]
    fn test_polygon_points_are_freed() {
        let handle = scn_cropper_new();
        let pixels = card_rgba();
        let mut points: *mut CPoint = std::ptr::null_mut();
        let mut count = 0usize;

        let code =
            unsafe { scn_crop_polygon_rgba(handle, pixels.as_ptr(), 160, 120, &mut points, &mut count) };
        assert_eq!(code, SCN_OK);
        assert!(count >= 4);
        assert!(!points.is_null());

        unsafe {
            scn_free_points(points, count);
            scn_cropper_free(handle);
        }
    }

    #[test]
    fn test_error_codes() {
        let handle = scn_cropper_new();
        let pixels = card_rgba();
        let mut rect = COrientedRect::default();

        let code = unsafe { scn_crop_box_rgba(std::ptr::null(), pixels.as_ptr(), 160, 120, &mut rect) };
        assert_eq!(code, SCN_NULL_POINTER);

        let code = unsafe { scn_crop_box_rgba(handle, pixels.as_ptr(), 0, 120, &mut rect) };
        assert_eq!(code, SCN_INVALID_IMAGE);

        let code = unsafe { scn_crop_box_rgba(handle, pixels.as_ptr(), 160, 120, &mut rect) };
        assert_eq!(code, SCN_OK);
        assert!(rect.width * rect.height > 5000.0);

        unsafe { scn_cropper_free(handle) };
    }

    #[test]
    fn test_version_is_nul_terminated() {
        let v = unsafe { CStr::from_ptr(scn_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
