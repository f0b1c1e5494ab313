use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cropper::{CropMode, DocumentCropper};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Light card covering the middle of a dark frame.
fn card_scene(width: u32, height: u32) -> DynamicImage {
    let mut rgb = RgbImage::from_pixel(width, height, Rgb([30, 30, 30]));
    draw_filled_rect_mut(
        &mut rgb,
        Rect::at((width / 5) as i32, (height / 6) as i32).of_size(width * 3 / 5, height * 2 / 3),
        Rgb([235, 235, 230]),
    );
    DynamicImage::ImageRgb8(rgb)
}

fn benchmark_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop_modes");
    group.sample_size(20);

    let cropper = DocumentCropper::default();
    let img = card_scene(640, 480);

    for (name, mode) in [
        ("rect", CropMode::Rect),
        ("box", CropMode::Box),
        ("polygon", CropMode::Polygon),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &mode, |b, &mode| {
            b.iter(|| cropper.detect(black_box(&img), mode).expect("detection failed"));
        });
    }

    group.finish();
}

fn benchmark_image_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop_rect_by_size");
    group.sample_size(10);

    let cropper = DocumentCropper::default();
    for (w, h) in [(320u32, 240u32), (1280, 960)] {
        let img = card_scene(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &img, |b, img| {
            b.iter(|| cropper.crop_rect(black_box(img)).expect("detection failed"));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_modes, benchmark_image_sizes);
criterion_main!(benches);
