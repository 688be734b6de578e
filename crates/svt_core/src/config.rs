//! Denoiser configuration.
//!
//! Defaults: 4x4 blocks tracked over 15-frame windows with a 7 pixel ARPS
//! neighbourhood, soft thresholding.

use crate::error::{Result, SvtError};
use crate::float_trait::SvtFloat;
use crate::svt::Thresholding;

// =============================================================================
// Constants
// =============================================================================

/// Default block edge length.
const DEFAULT_BLOCK_SIZE: usize = 4;

/// Default anchor stride.
const DEFAULT_BLOCK_OVERLAP: usize = 1;

/// Default temporal window length (`Nt`).
const DEFAULT_WINDOW_LEN: usize = 15;

/// Default ARPS search radius around each anchor.
const DEFAULT_SEARCH_RADIUS: usize = 7;

/// Predictive motion is disabled unless asked for.
const DEFAULT_MOTION_PENALTY: f64 = 0.0;

const PROFILE_TIMING_ENV: &str = "SVT_PROFILE_TIMING";

// =============================================================================
// Types
// =============================================================================

/// Configuration for motion-tracked singular value thresholding.
///
/// Use `Default::default()` for the standard PGURE-SVT settings.
#[derive(Debug, Clone)]
pub struct SvtConfig<F: SvtFloat> {
    /// Block edge length `B`. Default: 4
    pub block_size: usize,
    /// Stride between anchors. Default: 1
    pub block_overlap: usize,
    /// Frames per window (`Nt`). Must be odd and at most `B² - 1`. Default: 15
    pub window_len: usize,
    /// Radius of the small diamond search neighbourhood. Default: 7
    pub search_radius: usize,
    /// Singular value shrinkage rule. Default: soft thresholding
    pub thresholding: Thresholding,
    /// Weight of the predictive motion term in the tracker cost. Default: 0.0
    pub motion_penalty: F,
}

impl<F: SvtFloat> Default for SvtConfig<F> {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            block_overlap: DEFAULT_BLOCK_OVERLAP,
            window_len: DEFAULT_WINDOW_LEN,
            search_radius: DEFAULT_SEARCH_RADIUS,
            thresholding: Thresholding::default(),
            motion_penalty: F::from_f64_c(DEFAULT_MOTION_PENALTY),
        }
    }
}

impl<F: SvtFloat> SvtConfig<F> {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames on each side of the window centre.
    pub fn half_window(&self) -> usize {
        self.window_len / 2
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(SvtError::InvalidConfig("block_size must be > 0".to_string()));
        }
        if self.block_overlap == 0 {
            return Err(SvtError::InvalidConfig(
                "block_overlap must be > 0".to_string(),
            ));
        }
        if self.block_overlap > self.block_size {
            return Err(SvtError::InvalidConfig(format!(
                "block_overlap {} must not exceed block_size {}",
                self.block_overlap, self.block_size
            )));
        }
        if self.window_len == 0 || self.window_len % 2 == 0 {
            return Err(SvtError::InvalidConfig(format!(
                "window_len must be odd, got {}",
                self.window_len
            )));
        }
        // Keeps every Casorati matrix taller than it is wide.
        let max_window = (self.block_size * self.block_size).saturating_sub(1);
        if self.window_len > max_window {
            return Err(SvtError::InvalidConfig(format!(
                "window_len {} exceeds block_size² - 1 = {}",
                self.window_len, max_window
            )));
        }
        if self.search_radius == 0 {
            return Err(SvtError::InvalidConfig(
                "search_radius must be > 0".to_string(),
            ));
        }
        if !self.motion_penalty.is_finite() || self.motion_penalty < F::zero() {
            return Err(SvtError::InvalidConfig(
                "motion_penalty must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether per-frame timing should be logged (`SVT_PROFILE_TIMING=1`).
pub(crate) fn resolve_profile_timing() -> bool {
    std::env::var(PROFILE_TIMING_ENV)
        .ok()
        .map(|value| {
            let v = value.trim();
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}
