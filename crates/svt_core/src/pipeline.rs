//! SVT Pipeline - per-frame window denoising and sequence processing.
//!
//! Each output frame is denoised in its own temporal window: the filtered
//! window drives motion tracking, the raw window is factorized along the
//! tracked trajectories, a threshold is chosen and only the target frame of
//! the reconstruction is kept.

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::{resolve_profile_timing, SvtConfig};
use crate::error::{Result, SvtError};
use crate::float_trait::SvtFloat;
use crate::motion::MotionTracker;
use crate::search::ThresholdSearch;
use crate::svt::BlockSvd;
use crate::window::WindowPlacement;

/// Denoised frame with the decisions that produced it.
#[derive(Debug, Clone)]
pub struct FrameOutcome<F> {
    /// Denoised frame in the input's intensity scale.
    pub frame: Array2<F>,
    /// Threshold applied to the normalized window.
    pub threshold: F,
    /// Reconstructions requested by the threshold search.
    pub evaluations: usize,
    pub placement: WindowPlacement,
}

/// Denoise frame `target` of `noisy`.
///
/// `filtered` is a pre-filtered copy of the same sequence used only for
/// motion tracking. Both must have shape `(frames, rows, cols)`.
pub fn denoise_frame<F, S>(
    noisy: ArrayView3<F>,
    filtered: ArrayView3<F>,
    target: usize,
    config: &SvtConfig<F>,
    search: &S,
) -> Result<FrameOutcome<F>>
where
    F: SvtFloat,
    S: ThresholdSearch<F> + ?Sized,
{
    validate_inputs(noisy, filtered, config)?;
    let frames = noisy.dim().0;
    if target >= frames {
        return Err(SvtError::FrameOutOfRange {
            index: target,
            frames,
        });
    }
    Ok(denoise_window(
        noisy,
        filtered,
        target,
        config,
        search,
        resolve_profile_timing(),
    ))
}

/// Denoise every frame of `noisy`, one rayon task per frame.
///
/// Frames are independent; the result does not depend on the number of
/// worker threads.
pub fn denoise_sequence<F, S>(
    noisy: ArrayView3<F>,
    filtered: ArrayView3<F>,
    config: &SvtConfig<F>,
    search: &S,
) -> Result<Array3<F>>
where
    F: SvtFloat,
    S: ThresholdSearch<F> + ?Sized,
{
    validate_inputs(noisy, filtered, config)?;
    let (n, rows, cols) = noisy.dim();
    let profile_timing = resolve_profile_timing();
    let started = Instant::now();

    let results: Vec<FrameOutcome<F>> = (0..n)
        .into_par_iter()
        .map(|t| denoise_window(noisy, filtered, t, config, search, profile_timing))
        .collect();

    // Consolidate
    let mut output = Array3::<F>::zeros((n, rows, cols));
    let mut evaluations = 0usize;
    for (i, res) in results.into_iter().enumerate() {
        output.slice_mut(s![i, .., ..]).assign(&res.frame);
        evaluations += res.evaluations;
    }

    info!(
        frames = n,
        rows,
        cols,
        window_len = config.window_len,
        evaluations,
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "denoised sequence"
    );
    Ok(output)
}

fn validate_inputs<F: SvtFloat>(
    noisy: ArrayView3<F>,
    filtered: ArrayView3<F>,
    config: &SvtConfig<F>,
) -> Result<()> {
    config.validate()?;
    if noisy.dim() != filtered.dim() {
        return Err(SvtError::ShapeMismatch {
            noisy: noisy.dim(),
            filtered: filtered.dim(),
        });
    }
    let (frames, rows, cols) = noisy.dim();
    if frames < config.window_len {
        return Err(SvtError::SequenceTooShort {
            frames,
            window_len: config.window_len,
        });
    }
    if rows < config.block_size || cols < config.block_size {
        return Err(SvtError::FrameTooSmall {
            rows,
            cols,
            block_size: config.block_size,
        });
    }
    Ok(())
}

/// Scale `window` by its own maximum. Returns the scale; a window whose
/// maximum is not positive is left as is with scale 1.
fn normalize_window<F: SvtFloat>(window: ArrayView3<F>) -> (Array3<F>, F) {
    let max = window.iter().copied().fold(F::neg_infinity(), F::max);
    if max > F::zero() && max.is_finite() {
        (window.mapv(|v| v / max), max)
    } else {
        (window.to_owned(), F::one())
    }
}

fn denoise_window<F, S>(
    noisy: ArrayView3<F>,
    filtered: ArrayView3<F>,
    target: usize,
    config: &SvtConfig<F>,
    search: &S,
    profile_timing: bool,
) -> FrameOutcome<F>
where
    F: SvtFloat,
    S: ThresholdSearch<F> + ?Sized,
{
    let started = profile_timing.then(Instant::now);
    let placement = WindowPlacement::for_frame(target, config.half_window(), noisy.dim().0);
    let (start, end) = (placement.start, placement.end());

    let (raw, scale) = normalize_window(noisy.slice(s![start..end, .., ..]));
    let (guide, _) = normalize_window(filtered.slice(s![start..end, .., ..]));

    let trajectories = MotionTracker::new(config.block_size, config.search_radius)
        .with_stride(config.block_overlap)
        .with_motion_penalty(config.motion_penalty)
        .estimate(guide.view(), &placement);
    let tracked_at = started.map(|_| Instant::now());

    let decomposition = BlockSvd::new(config.block_size, config.block_overlap)
        .decompose(raw.view(), &trajectories);
    let decomposed_at = started.map(|_| Instant::now());

    let thresholding = config.thresholding;
    let mut reconstruct = |threshold: F| decomposition.reconstruct(threshold, thresholding);
    let outcome = search.search(&placement, raw.view(), &mut reconstruct);

    let window = decomposition.reconstruct(outcome.threshold, thresholding);
    let frame = window
        .index_axis(Axis(0), placement.reference)
        .mapv(|v| v * scale);

    debug!(
        frame = target,
        window_start = placement.start,
        regime = ?placement.regime,
        anchors = decomposition.len(),
        threshold = outcome.threshold.to_f64_c(),
        evaluations = outcome.evaluations,
        "window denoised"
    );
    if let (Some(t0), Some(t1), Some(t2)) = (started, tracked_at, decomposed_at) {
        trace!(
            frame = target,
            tracking_ms = (t1 - t0).as_secs_f64() * 1e3,
            decomposition_ms = (t2 - t1).as_secs_f64() * 1e3,
            search_ms = t2.elapsed().as_secs_f64() * 1e3,
            "window timing"
        );
    }

    FrameOutcome {
        frame,
        threshold: outcome.threshold,
        evaluations: outcome.evaluations,
        placement,
    }
}
