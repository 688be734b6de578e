//! Block motion tracking with the Adaptive Rood Pattern Search (ARPS).
//!
//! Given a (pre-filtered) window, every anchor of the lattice is followed from
//! the reference frame to both ends of the window, one adjacent-frame link at a
//! time. Each link runs a large diamond (rood) pass sized from the previous
//! link's motion, then refines with unit-step small diamond passes inside a
//! bounded neighbourhood of the link's source position.
//!
//! Reference: Nie & Ma, "Adaptive rood pattern search for fast block-matching
//! motion estimation", IEEE TIP 2002.

use ndarray::{s, Array3, ArrayView2, ArrayView3, Axis};

use crate::anchors::AnchorGrid;
use crate::float_trait::SvtFloat;
use crate::window::WindowPlacement;

/// Step size of the large diamond for anchors in the first lattice column.
const FIRST_COLUMN_STEP: isize = 2;

/// Slot of the zero offset in both diamond patterns.
const ZERO_INDEX: usize = 2;

/// Unit cross: up, left, centre, right, down.
const SDSP: [(isize, isize); 5] = [(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)];

/// Displacement of a block between two frames, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionVector {
    pub row: isize,
    pub col: isize,
}

impl MotionVector {
    pub const ZERO: Self = Self { row: 0, col: 0 };

    pub fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }

    /// Chebyshev length, used as the adaptive rood arm length.
    #[inline]
    pub fn magnitude(&self) -> isize {
        self.row.abs().max(self.col.abs())
    }

    /// True when the vector already lies on a rood arm of length `step`
    /// (this includes the zero vector for `step == 0`).
    #[inline]
    fn on_rood(&self, step: isize) -> bool {
        (self.col.abs() == step && self.row == 0) || (self.col == 0 && self.row.abs() == step)
    }
}

/// Per-anchor block positions and link motions for one window.
///
/// Positions are keyed by (axis, anchor, frame) with axis 0 = row and
/// axis 1 = col. Link `k` joins window frames `k` and `k + 1`; its motion is
/// the displacement in the direction the link was chained.
#[derive(Debug, Clone)]
pub struct Trajectories {
    grid: AnchorGrid,
    positions: Array3<usize>,
    motions: Array3<isize>,
    reference: usize,
}

impl Trajectories {
    /// Trajectories that never move: every anchor stays at its origin.
    pub fn stationary(grid: AnchorGrid, frames: usize, reference: usize) -> Self {
        let n = grid.len();
        let mut positions = Array3::<usize>::zeros((2, n, frames));
        for (index, (r, c)) in grid.iter().enumerate() {
            positions.slice_mut(s![0, index, ..]).fill(r);
            positions.slice_mut(s![1, index, ..]).fill(c);
        }
        Self {
            grid,
            positions,
            motions: Array3::zeros((2, n, frames.saturating_sub(1))),
            reference,
        }
    }

    pub fn grid(&self) -> &AnchorGrid {
        &self.grid
    }

    /// Number of tracked anchors.
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Frames covered by each trajectory.
    pub fn frames(&self) -> usize {
        self.positions.dim().2
    }

    /// Window frame where every anchor sits at its origin.
    pub fn reference_frame(&self) -> usize {
        self.reference
    }

    /// `(row, col)` of `anchor`'s block in window frame `frame`.
    #[inline]
    pub fn position(&self, anchor: usize, frame: usize) -> (usize, usize) {
        (
            self.positions[[0, anchor, frame]],
            self.positions[[1, anchor, frame]],
        )
    }

    /// Motion recorded for `anchor` on link `link`.
    #[inline]
    pub fn motion(&self, anchor: usize, link: usize) -> MotionVector {
        MotionVector::new(self.motions[[0, anchor, link]], self.motions[[1, anchor, link]])
    }

    /// Raw position table, shape `(2, anchors, frames)`.
    pub fn positions(&self) -> ArrayView3<'_, usize> {
        self.positions.view()
    }

    fn record(
        &mut self,
        anchor: usize,
        link: usize,
        frame: usize,
        to: (usize, usize),
        motion: MotionVector,
    ) {
        self.positions[[0, anchor, frame]] = to.0;
        self.positions[[1, anchor, frame]] = to.1;
        self.motions[[0, anchor, link]] = motion.row;
        self.motions[[1, anchor, link]] = motion.col;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainDirection {
    Forward,
    Backward,
}

/// ARPS block tracker. Stateless between windows.
#[derive(Debug, Clone)]
pub struct MotionTracker<F: SvtFloat> {
    block_size: usize,
    search_radius: usize,
    stride: usize,
    motion_penalty: F,
}

impl<F: SvtFloat> MotionTracker<F> {
    pub fn new(block_size: usize, search_radius: usize) -> Self {
        Self {
            block_size,
            search_radius,
            stride: 1,
            motion_penalty: F::zero(),
        }
    }

    /// Only track anchors of the lattice with this stride (default 1: every
    /// valid block origin). Each anchor is tracked independently, so a coarser
    /// stride gives the same trajectories for the anchors it keeps.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Penalize candidates by their distance from the position predicted by
    /// the previous link's motion. Zero disables the term.
    pub fn with_motion_penalty(mut self, weight: F) -> Self {
        self.motion_penalty = weight;
        self
    }

    /// Track every anchor through `window`, a `(frames, rows, cols)` stack.
    ///
    /// Anchors sit at their lattice origin in `placement.reference` and are
    /// chained forward to the last window frame and backward to the first.
    pub fn estimate(&self, window: ArrayView3<F>, placement: &WindowPlacement) -> Trajectories {
        let (frames, rows, cols) = window.dim();
        debug_assert_eq!(frames, placement.len);

        let grid = AnchorGrid::new((rows, cols), self.block_size, self.stride);
        let mut trajectories = Trajectories::stationary(grid, frames, placement.reference);
        if trajectories.is_empty() {
            return trajectories;
        }

        self.chain(
            window,
            &mut trajectories,
            placement.reference,
            ChainDirection::Forward,
            placement.forward_steps(),
        );
        self.chain(
            window,
            &mut trajectories,
            placement.reference,
            ChainDirection::Backward,
            placement.backward_steps(),
        );
        trajectories
    }

    /// Convenience form taking the target frame and sequence geometry directly.
    pub fn estimate_for_target(
        &self,
        window: ArrayView3<F>,
        target: usize,
        half_window: usize,
        total_frames: usize,
    ) -> Trajectories {
        let placement = WindowPlacement::for_frame(target, half_window, total_frames);
        self.estimate(window, &placement)
    }

    /// Follow all anchors `steps` links away from `reference`.
    fn chain(
        &self,
        window: ArrayView3<F>,
        trajectories: &mut Trajectories,
        reference: usize,
        direction: ChainDirection,
        steps: usize,
    ) {
        let side = 2 * self.search_radius + 1;
        let mut visited = vec![false; side * side];

        for step in 0..steps {
            let (from, to) = match direction {
                ChainDirection::Forward => (reference + step, reference + step + 1),
                ChainDirection::Backward => (reference - step, reference - step - 1),
            };
            let link = from.min(to);
            let previous_link = match (step, direction) {
                (0, _) => None,
                (_, ChainDirection::Forward) => Some(link - 1),
                (_, ChainDirection::Backward) => Some(link + 1),
            };
            let source_frame = window.index_axis(Axis(0), from);
            let target_frame = window.index_axis(Axis(0), to);

            for anchor in 0..trajectories.len() {
                let predictor = previous_link
                    .map(|l| trajectories.motion(anchor, l))
                    .unwrap_or_default();
                let first_column = trajectories.grid().column_of(anchor) == 0;
                let source = trajectories.position(anchor, from);

                let dest = self.search_link(
                    source_frame,
                    target_frame,
                    source,
                    predictor,
                    first_column,
                    &mut visited,
                );
                let motion = MotionVector::new(
                    dest.0 as isize - source.0 as isize,
                    dest.1 as isize - source.1 as isize,
                );
                trajectories.record(anchor, link, to, dest, motion);
            }
        }
    }

    /// Match the block at `source` in `source_frame` against `target_frame`.
    ///
    /// Returns the new block origin in `target_frame`. Small diamond moves are
    /// bounded to `search_radius` around `source`, so the radius limits the
    /// motion of a single link, not the drift over the whole window.
    fn search_link(
        &self,
        source_frame: ArrayView2<F>,
        target_frame: ArrayView2<F>,
        source: (usize, usize),
        predictor: MotionVector,
        first_column: bool,
        visited: &mut [bool],
    ) -> (usize, usize) {
        let bs = self.block_size;
        let (rows, cols) = target_frame.dim();
        let radius = self.search_radius as isize;
        let side = 2 * radius + 1;
        let inv_area = F::one() / F::usize_as(bs * bs);
        let (source_r, source_c) = (source.0 as isize, source.1 as isize);
        let predicted = (source_r + predictor.row, source_c + predictor.col);

        let reference_block =
            source_frame.slice(s![source.0..source.0 + bs, source.1..source.1 + bs]);

        let in_frame = |r: isize, c: isize| {
            r >= 0 && c >= 0 && r as usize + bs <= rows && c as usize + bs <= cols
        };
        let visited_slot = |r: isize, c: isize| -> Option<usize> {
            let (dr, dc) = (r - source_r, c - source_c);
            if dr.abs() > radius || dc.abs() > radius {
                None
            } else {
                Some(((dr + radius) * side + (dc + radius)) as usize)
            }
        };
        let cost_at = |r: isize, c: isize| -> F {
            let (r, c) = (r as usize, c as usize);
            let candidate = target_frame.slice(s![r..r + bs, c..c + bs]);
            let mut cost = squared_distance(reference_block, candidate) * inv_area;
            if self.motion_penalty > F::zero() {
                let (pr, pc) = (predicted.0 - r as isize, predicted.1 - c as isize);
                cost += self.motion_penalty * F::isize_as(pr * pr + pc * pc).sqrt();
            }
            cost
        };

        visited.fill(false);
        let (mut cur_r, mut cur_c) = (source_r, source_c);
        let mut cur_cost = cost_at(cur_r, cur_c);
        if let Some(slot) = visited_slot(cur_r, cur_c) {
            visited[slot] = true;
        }

        // Large diamond: rood arms at the adaptive step plus the predicted motion.
        let (step, extra) = if first_column {
            (FIRST_COLUMN_STEP, None)
        } else {
            let step = predictor.magnitude();
            let extra = (!predictor.on_rood(step)).then_some((predictor.row, predictor.col));
            (step, extra)
        };
        let mut ldsp = [(0isize, 0isize); 6];
        for (slot, &(dr, dc)) in ldsp.iter_mut().zip(SDSP.iter()) {
            *slot = (dr * step, dc * step);
        }
        let candidates = match extra {
            Some(offset) => {
                ldsp[5] = offset;
                6
            }
            None => 5,
        };

        let mut costs = [F::max_value(); 6];
        costs[ZERO_INDEX] = cur_cost;
        if step != 0 {
            for (k, &(dr, dc)) in ldsp.iter().enumerate().take(candidates) {
                if k == ZERO_INDEX {
                    continue;
                }
                let (r, c) = (cur_r + dr, cur_c + dc);
                if !in_frame(r, c) {
                    continue;
                }
                costs[k] = cost_at(r, c);
                if let Some(slot) = visited_slot(r, c) {
                    visited[slot] = true;
                }
            }
        }
        let best = argmin_prefer_zero(&costs[..candidates]);
        cur_r += ldsp[best].0;
        cur_c += ldsp[best].1;
        cur_cost = costs[best];

        // Small diamond until the centre is the local optimum.
        loop {
            let mut costs = [F::max_value(); 5];
            costs[ZERO_INDEX] = cur_cost;
            for (k, &(dr, dc)) in SDSP.iter().enumerate() {
                if k == ZERO_INDEX {
                    continue;
                }
                let (r, c) = (cur_r + dr, cur_c + dc);
                if !in_frame(r, c) {
                    continue;
                }
                let Some(slot) = visited_slot(r, c) else {
                    continue;
                };
                if visited[slot] {
                    continue;
                }
                visited[slot] = true;
                costs[k] = cost_at(r, c);
            }

            let best = argmin_prefer_zero(&costs);
            if best == ZERO_INDEX {
                break;
            }
            cur_r += SDSP[best].0;
            cur_c += SDSP[best].1;
            cur_cost = costs[best];
        }

        (cur_r as usize, cur_c as usize)
    }
}

/// Index of the smallest cost; the zero offset wins ties so that a block on
/// a flat or unchanged background stays put.
#[inline]
fn argmin_prefer_zero<F: SvtFloat>(costs: &[F]) -> usize {
    let mut best = ZERO_INDEX;
    for (k, &cost) in costs.iter().enumerate() {
        if cost < costs[best] {
            best = k;
        }
    }
    best
}

/// Squared Frobenius distance between two equally sized blocks.
#[inline]
fn squared_distance<F: SvtFloat>(p1: ArrayView2<F>, p2: ArrayView2<F>) -> F {
    let mut sum_sq = F::zero();
    for (r1, r2) in p1.outer_iter().zip(p2.outer_iter()) {
        for (a, b) in r1.iter().zip(r2.iter()) {
            let diff = *a - *b;
            sum_sq += diff * diff;
        }
    }
    sum_sq
}
