use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use thumbgen::parallel::partition;
use thumbgen::processing::{transform, FilterType};
use thumbgen::SourceImage;

fn benchmark_partition(c: &mut Criterion) {
    let images: Vec<SourceImage> = (0..10_000)
        .map(|i| SourceImage::new(format!("photos/img_{:05}.jpg", i)))
        .collect();

    let mut group = c.benchmark_group("partition");
    for threads in [1usize, 3, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| partition(black_box(images.clone()), threads, Path::new("thumbs")))
        });
    }
    group.finish();
}

fn benchmark_transform(c: &mut Criterion) {
    let source = DynamicImage::ImageRgb8(RgbImage::from_fn(1920, 1080, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 96])
    }));

    let mut group = c.benchmark_group("transform_1920x1080");
    for filter in [FilterType::Nearest, FilterType::Triangle, FilterType::Lanczos3] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", filter)),
            &filter,
            |b, &filter| b.iter(|| transform(black_box(&source), 0.08, filter)),
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_partition, benchmark_transform);
criterion_main!(benches);
