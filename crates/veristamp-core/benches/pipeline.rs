//! Benchmarks for the local stages of the attestation pipeline.
//!
//! Run with: cargo bench -p veristamp-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use veristamp_core::config::{CodecConfig, Transport};
use veristamp_core::pipeline::{CodeGenerator, Compositor, ImageCodec};

/// A 4000x3000 gradient, about the size of a phone capture.
fn synthetic_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(4000, 3000, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn benchmark_encode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.png");
    synthetic_photo().save(&path).unwrap();

    let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);
    c.bench_function("encode_bounded_jpeg", |b| {
        b.iter(|| {
            let _ = codec.encode(black_box(&path));
        })
    });
}

fn benchmark_qr(c: &mut Criterion) {
    let generator = CodeGenerator::default();
    let payload = "https://verify.example.com/a/3f2c9d1e-5b7a-4c0e-9f1d-8e2b6a4c7d90";

    c.bench_function("qr_generate", |b| {
        b.iter(|| {
            let _ = generator.generate(black_box(payload));
        })
    });
}

fn benchmark_composite(c: &mut Criterion) {
    let photo = synthetic_photo();
    let code = CodeGenerator::default()
        .generate("https://verify.example.com/a/42")
        .unwrap();
    let compositor = Compositor::default();

    c.bench_function("composite_4000x3000", |b| {
        b.iter(|| {
            let _ = compositor.composite(black_box(&photo), black_box(&code));
        })
    });
}

criterion_group!(benches, benchmark_encode, benchmark_qr, benchmark_composite);
criterion_main!(benches);
