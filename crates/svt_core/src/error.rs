//! Error type for the sequence-level entry points.
//!
//! The tracker and the SVD engine never fail: geometry rejections are skipped
//! and zero-weight pixels resolve to zero. Errors only arise where a caller
//! hands the pipeline a configuration or input it cannot honour.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SvtError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: noisy sequence {noisy:?}, filtered sequence {filtered:?}")]
    ShapeMismatch {
        noisy: (usize, usize, usize),
        filtered: (usize, usize, usize),
    },

    #[error("sequence has {frames} frames but the window needs {window_len}")]
    SequenceTooShort { frames: usize, window_len: usize },

    #[error("frame size ({rows}, {cols}) is smaller than block_size {block_size}")]
    FrameTooSmall {
        rows: usize,
        cols: usize,
        block_size: usize,
    },

    #[error("frame index {index} out of range for a sequence of {frames} frames")]
    FrameOutOfRange { index: usize, frames: usize },
}

pub type Result<T> = std::result::Result<T, SvtError>;
