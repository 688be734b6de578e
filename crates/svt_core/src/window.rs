//! Temporal window placement.
//!
//! Every output frame `t` is denoised inside a window of exactly `2h + 1`
//! frames. Near the ends of the sequence the window is clamped so it stays
//! inside `[0, total_frames)`, and the target moves off-centre.

/// Which boundary rule placed the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRegime {
    /// `t < h`: window starts at frame 0.
    Start,
    /// Window centred on `t`.
    Interior,
    /// `t >= total - h`: window ends at the last frame.
    End,
}

/// Location of one window in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlacement {
    /// Sequence index of the frame being denoised.
    pub target: usize,
    /// Sequence index of the first window frame.
    pub start: usize,
    /// Frames in the window.
    pub len: usize,
    /// Offset of `target` inside the window. Trajectories are anchored here.
    pub reference: usize,
    pub regime: WindowRegime,
}

impl WindowPlacement {
    /// Place the window for `target`. Requires `total_frames >= 2 * half_window + 1`.
    pub fn for_frame(target: usize, half_window: usize, total_frames: usize) -> Self {
        let len = 2 * half_window + 1;
        if target < half_window {
            Self {
                target,
                start: 0,
                len,
                reference: target,
                regime: WindowRegime::Start,
            }
        } else if target + half_window >= total_frames {
            let start = total_frames - len;
            Self {
                target,
                start,
                len,
                reference: target - start,
                regime: WindowRegime::End,
            }
        } else {
            Self {
                target,
                start: target - half_window,
                len,
                reference: half_window,
                regime: WindowRegime::Interior,
            }
        }
    }

    /// One past the last window frame.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Links chained from the reference frame towards the end of the window.
    pub fn forward_steps(&self) -> usize {
        self.len - 1 - self.reference
    }

    /// Links chained from the reference frame towards the start of the window.
    pub fn backward_steps(&self) -> usize {
        self.reference
    }
}
