//! Benchmarks for the superbook-deskew pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_complex::Complex64;
use superbook_deskew::deskew::fft::ComplexMatrix;
use superbook_deskew::resample::rotate;
use superbook_deskew::{
    binarize, find_boxes, DeskewOptions, PageDeskewer, PixelFormat, RasterImage,
};

/// Page of ruled glyph rows, tilted by `angle`
fn synthetic_page(size: u32, angle: f64) -> RasterImage {
    let mut page = RasterImage::blank(size, size, PixelFormat::Gray8).with_dpi(150.0, 150.0);
    let margin = size / 8;
    for y in margin..size - margin {
        if y % 30 >= 12 {
            continue;
        }
        for x in margin..size - margin {
            if x % 12 < 8 {
                page.set_pixel(x, y, 0);
            }
        }
    }
    rotate(&page, angle).unwrap_or(page)
}

/// Benchmark option builder construction
fn bench_option_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("option_builders");

    group.bench_function("DeskewOptions::builder", |b| {
        b.iter(|| {
            black_box(
                DeskewOptions::builder()
                    .preview_max_side(512)
                    .angle_step(0.005)
                    .build(),
            )
        })
    });

    group.bench_function("DeskewOptions::accurate", |b| {
        b.iter(|| black_box(DeskewOptions::accurate()))
    });

    group.finish();
}

/// Benchmark the 2D FFT at preview sizes
fn bench_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_2d");
    group.sample_size(20);

    for side in [256usize, 512, 1024] {
        let matrix =
            ComplexMatrix::from_fn(side, side, |x, y| Complex64::new(((x ^ y) & 1) as f64, 0.0))
                .unwrap();
        for parallel in [false, true] {
            let id = BenchmarkId::new(if parallel { "parallel" } else { "serial" }, side);
            group.bench_with_input(id, &matrix, |b, matrix| {
                b.iter(|| {
                    let mut m = matrix.clone();
                    m.fft_2d(parallel);
                    black_box(m)
                })
            });
        }
    }

    group.finish();
}

/// Benchmark the raster stages
fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let page = synthetic_page(1024, 0.04);

    group.bench_function("rotate", |b| b.iter(|| black_box(rotate(&page, -0.04))));

    group.bench_function("binarize", |b| b.iter(|| black_box(binarize(&page))));

    let mask = binarize(&page).unwrap();
    group.bench_function("find_boxes", |b| b.iter(|| black_box(find_boxes(&mask))));

    group.finish();
}

/// Benchmark skew detection and the full pipeline
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for size in [512u32, 1024] {
        let page = synthetic_page(size, 0.05);
        group.bench_with_input(BenchmarkId::new("detect_skew", size), &page, |b, page| {
            b.iter(|| black_box(PageDeskewer::detect_skew(page, &DeskewOptions::default())))
        });
        group.bench_with_input(BenchmarkId::new("deskew", size), &page, |b, page| {
            b.iter(|| black_box(PageDeskewer::deskew(page, &DeskewOptions::default())))
        });
    }

    let pages: Vec<RasterImage> = (0..4).map(|i| synthetic_page(512, 0.01 * i as f64)).collect();
    group.bench_function("deskew_batch/4x512", |b| {
        b.iter(|| black_box(PageDeskewer::deskew_batch(&pages, &DeskewOptions::fast())))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_option_builders,
    bench_fft,
    bench_stages,
    bench_pipeline,
);

criterion_main!(benches);
