//! SVT Core Algorithm Library
//!
//! Pure Rust implementation of motion-tracked singular value thresholding for
//! denoising microscopy image sequences. Blocks are followed through a
//! temporal window with the Adaptive Rood Pattern Search, stacked into
//! Casorati matrices and rebuilt from shrunk singular values.

pub mod anchors;
pub mod config;
pub mod error;
pub mod float_trait;
pub mod motion;
pub mod pipeline;
pub mod search;
pub mod svt;
pub mod window;

// Re-export commonly used types at the crate root
pub use anchors::AnchorGrid;
pub use config::SvtConfig;
pub use error::{Result, SvtError};
pub use float_trait::SvtFloat;
pub use motion::{MotionTracker, MotionVector, Trajectories};
pub use pipeline::{denoise_frame, denoise_sequence, FrameOutcome};
pub use search::{
    risk_fn, BoundedSearch, FixedThreshold, RiskObjective, SearchOutcome, ThresholdSearch,
};
pub use svt::{BlockSvd, Thresholding, WindowDecomposition};
pub use window::{WindowPlacement, WindowRegime};
