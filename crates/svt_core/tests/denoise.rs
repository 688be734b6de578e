//! End-to-end denoising on synthetic microscopy-like sequences.

use ndarray::{s, Array3, ArrayView2, ArrayView3, Axis};
use rand::prelude::*;
use rand_distr::Normal;

use svt_core::{
    denoise_frame, denoise_sequence, risk_fn, BoundedSearch, FixedThreshold, SvtConfig,
    SvtError, Thresholding, WindowPlacement,
};

/// Static textured scene with intensities in roughly [1, 2].
fn static_scene(frames: usize, size: usize) -> Array3<f64> {
    Array3::from_shape_fn((frames, size, size), |(_, r, c)| {
        let (y, x) = (r as f64, c as f64);
        1.5 + 0.3 * (y / 4.0).sin() + 0.2 * (x / 3.0).cos()
    })
}

/// Same texture drifting one pixel to the right per frame.
fn drifting_scene(frames: usize, size: usize) -> Array3<f64> {
    Array3::from_shape_fn((frames, size, size), |(t, r, c)| {
        let (y, x) = (r as f64, c as f64 - t as f64);
        1.5 + 0.3 * (y / 4.0).sin() + 0.2 * (x / 3.0).cos()
    })
}

fn add_noise(clean: &Array3<f64>, sigma: f64, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();
    clean.mapv(|v| v + rng.sample(normal))
}

fn mse(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    let n = a.len() as f64;
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / n
}

fn sequence_mse(a: ArrayView3<f64>, b: ArrayView3<f64>) -> f64 {
    let n = a.len() as f64;
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / n
}

fn config() -> SvtConfig<f64> {
    SvtConfig {
        block_overlap: 2,
        ..SvtConfig::default()
    }
}

#[test]
fn test_fixed_threshold_reduces_noise_on_static_scene() {
    let clean = static_scene(17, 32);
    let noisy = add_noise(&clean, 0.1, 1);

    // Pre-filtered copy: the clean scene.
    let denoised = denoise_sequence(
        noisy.view(),
        clean.view(),
        &config(),
        &FixedThreshold::new(0.35),
    )
    .unwrap();

    let before = sequence_mse(noisy.view(), clean.view());
    let after = sequence_mse(denoised.view(), clean.view());
    assert!(after < 0.7 * before, "mse before {} after {}", before, after);
}

#[test]
fn test_weighted_mode_reduces_noise_on_static_scene() {
    let clean = static_scene(15, 24);
    let noisy = add_noise(&clean, 0.1, 2);
    let config = SvtConfig {
        thresholding: Thresholding::GaussianWeighted,
        ..config()
    };

    let denoised = denoise_sequence(noisy.view(), clean.view(), &config, &FixedThreshold::new(0.5))
        .unwrap();

    let before = sequence_mse(noisy.view(), clean.view());
    let after = sequence_mse(denoised.view(), clean.view());
    assert!(after < before, "mse before {} after {}", before, after);
}

#[test]
fn test_oracle_risk_search_beats_noisy_input() {
    let clean = static_scene(15, 24);
    let noisy = add_noise(&clean, 0.1, 3);

    let objective = {
        let noisy = noisy.clone();
        let clean = clean.clone();
        risk_fn(move |p: &WindowPlacement, _: ArrayView3<f64>, candidate: ArrayView3<f64>| {
            let scale = noisy
                .slice(s![p.start..p.end(), .., ..])
                .iter()
                .copied()
                .fold(f64::MIN, f64::max);
            let truth = clean.slice(s![p.start..p.end(), .., ..]);
            sequence_mse(candidate.mapv(|v| v * scale).view(), truth)
        })
    };
    let search = BoundedSearch::new(objective);

    let outcome = denoise_frame(noisy.view(), clean.view(), 7, &config(), &search).unwrap();
    assert!(outcome.evaluations > 2);
    assert!(outcome.evaluations <= 1000);
    assert!(outcome.threshold > 0.0 && outcome.threshold < 1.0);

    let before = mse(noisy.index_axis(Axis(0), 7), clean.index_axis(Axis(0), 7));
    let after = mse(outcome.frame.view(), clean.index_axis(Axis(0), 7));
    assert!(after < 0.7 * before, "mse before {} after {}", before, after);
}

#[test]
fn test_tracking_follows_drifting_scene() {
    let clean = drifting_scene(15, 32);
    let noisy = add_noise(&clean, 0.1, 4);

    let outcome = denoise_frame(
        noisy.view(),
        clean.view(),
        7,
        &config(),
        &FixedThreshold::new(0.35),
    )
    .unwrap();

    // Columns whose trajectories stay inside the frame over the whole window.
    fn interior(frame: ArrayView2<'_, f64>) -> ArrayView2<'_, f64> {
        frame.slice_move(s![8..24, 10..20])
    }
    let truth = clean.index_axis(Axis(0), 7);
    let before = mse(interior(noisy.index_axis(Axis(0), 7)), interior(truth));
    let after = mse(interior(outcome.frame.view()), interior(truth));
    assert!(after < before, "mse before {} after {}", before, after);
}

#[test]
fn test_fixed_mode_performs_no_search() {
    let clean = static_scene(15, 16);
    let noisy = add_noise(&clean, 0.05, 5);
    for t in 0..15 {
        let outcome =
            denoise_frame(noisy.view(), clean.view(), t, &config(), &FixedThreshold::new(0.2))
                .unwrap();
        assert_eq!(outcome.evaluations, 0);
        assert_eq!(outcome.threshold, 0.2);
        assert_eq!(outcome.placement.start + outcome.placement.reference, t);
    }
}

#[test]
fn test_output_independent_of_thread_count() {
    let clean = drifting_scene(16, 20);
    let noisy = add_noise(&clean, 0.1, 6);
    let search = FixedThreshold::new(0.3);
    let config = config();

    let run = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| denoise_sequence(noisy.view(), clean.view(), &config, &search).unwrap())
    };

    let single = run(1);
    let multi = run(4);
    assert_eq!(single, multi);
}

#[test]
fn test_f32_matches_f64() {
    let clean = static_scene(15, 16);
    let noisy = add_noise(&clean, 0.1, 7);
    let noisy_f32 = noisy.mapv(|v| v as f32);
    let clean_f32 = clean.mapv(|v| v as f32);

    let out_f64 = denoise_sequence(noisy.view(), clean.view(), &config(), &FixedThreshold::new(0.3))
        .unwrap();
    let config_f32: SvtConfig<f32> = SvtConfig {
        block_overlap: 2,
        ..SvtConfig::default()
    };
    let out_f32 = denoise_sequence(
        noisy_f32.view(),
        clean_f32.view(),
        &config_f32,
        &FixedThreshold::new(0.3f32),
    )
    .unwrap();

    for (a, b) in out_f64.iter().zip(out_f32.iter()) {
        assert!((a - *b as f64).abs() < 1e-3, "{} vs {}", a, b);
    }
}

#[test]
fn test_invalid_inputs_are_rejected_before_work_starts() {
    let noisy = Array3::<f64>::zeros((15, 16, 16));
    let filtered = Array3::<f64>::zeros((14, 16, 16));
    let err = denoise_sequence(noisy.view(), filtered.view(), &config(), &FixedThreshold::new(0.1))
        .unwrap_err();
    assert!(matches!(err, SvtError::ShapeMismatch { .. }));

    let too_wide = SvtConfig {
        window_len: 17,
        ..config()
    };
    let err = denoise_sequence(noisy.view(), noisy.view(), &too_wide, &FixedThreshold::new(0.1))
        .unwrap_err();
    assert!(matches!(err, SvtError::InvalidConfig(_)));
}
