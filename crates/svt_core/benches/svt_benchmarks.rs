//! Criterion benchmarks for SVT core operations.
//!
//! Run with: cargo bench -p svt_core
//! Run specific: cargo bench -p svt_core -- motion_tracking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array3;
use rand::prelude::*;

use svt_core::{
    denoise_sequence, AnchorGrid, BlockSvd, FixedThreshold, MotionTracker, SvtConfig, Thresholding,
    Trajectories, WindowPlacement,
};

// =============================================================================
// Helper Functions for Test Data Generation
// =============================================================================

fn random_stack_f32(frames: usize, rows: usize, cols: usize, seed: u64) -> Array3<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn((frames, rows, cols), |_| rng.gen())
}

fn random_stack_f64(frames: usize, rows: usize, cols: usize, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn((frames, rows, cols), |_| rng.gen())
}

/// Smooth texture drifting one pixel right per frame, plus noise.
fn drifting_stack(frames: usize, size: usize, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn((frames, size, size), |(t, r, c)| {
        let x = c as f64 - t as f64;
        let y = r as f64;
        1.5 + (y / 5.0).sin() * (x / 7.0).cos() + 0.1 * rng.gen::<f64>()
    })
}

// =============================================================================
// Motion Tracking Benchmarks
// =============================================================================

fn bench_motion_tracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion_tracking");

    for size in [32, 64, 128] {
        let window = drifting_stack(15, size, 42);
        let placement = WindowPlacement::for_frame(7, 7, 15);
        let tracker = MotionTracker::<f64>::new(4, 7);

        group.throughput(Throughput::Elements((15 * size * size) as u64));

        group.bench_with_input(BenchmarkId::new("arps_b4_r7", size), &size, |b, _| {
            b.iter(|| tracker.estimate(black_box(window.view()), &placement))
        });
    }

    group.finish();
}

// =============================================================================
// Block SVD Benchmarks
// =============================================================================

fn bench_block_svd(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_svd");

    for size in [32, 64, 128] {
        let window = random_stack_f64(15, size, size, 7);
        let trajectories =
            Trajectories::stationary(AnchorGrid::new((size, size), 4, 1), 15, 7);
        let engine = BlockSvd::new(4, 1);

        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("decompose", size), &size, |b, _| {
            b.iter(|| engine.decompose(black_box(window.view()), &trajectories))
        });

        let decomposition = engine.decompose(window.view(), &trajectories);
        for mode in [Thresholding::Soft, Thresholding::GaussianWeighted] {
            let name = format!("reconstruct_{:?}", mode);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| decomposition.reconstruct(black_box(0.1), mode))
            });
        }
    }

    group.finish();
}

// =============================================================================
// Full Sequence Benchmarks
// =============================================================================

fn bench_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("denoise_sequence");
    group.sample_size(10);

    let config: SvtConfig<f64> = SvtConfig::default();
    let search = FixedThreshold::new(0.05);

    for size in [32, 64] {
        let noisy = drifting_stack(20, size, 11);
        group.throughput(Throughput::Elements((20 * size * size) as u64));
        group.bench_with_input(BenchmarkId::new("fixed_threshold", size), &size, |b, _| {
            b.iter(|| denoise_sequence(black_box(noisy.view()), noisy.view(), &config, &search))
        });
    }

    group.finish();
}

// =============================================================================
// f32 vs f64 Precision Comparison Benchmarks
// =============================================================================

fn bench_precision_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("f32_vs_f64");
    group.sample_size(10);

    let size = 64;
    let noisy_f32 = random_stack_f32(15, size, size, 42);
    let noisy_f64 = random_stack_f64(15, size, size, 42);
    let config_f32: SvtConfig<f32> = SvtConfig::default();
    let config_f64: SvtConfig<f64> = SvtConfig::default();

    group.throughput(Throughput::Elements((15 * size * size) as u64));

    group.bench_function("svt_64_f32", |b| {
        b.iter(|| {
            denoise_sequence(
                black_box(noisy_f32.view()),
                noisy_f32.view(),
                &config_f32,
                &FixedThreshold::new(0.05f32),
            )
        })
    });

    group.bench_function("svt_64_f64", |b| {
        b.iter(|| {
            denoise_sequence(
                black_box(noisy_f64.view()),
                noisy_f64.view(),
                &config_f64,
                &FixedThreshold::new(0.05f64),
            )
        })
    });

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_motion_tracking,
    bench_block_svd,
    bench_sequence,
    bench_precision_comparison,
);

criterion_main!(benches);
