//! Threshold selection for one window.
//!
//! A [`ThresholdSearch`] picks the shrinkage threshold of a window by asking
//! for reconstructions at candidate thresholds and scoring them with a
//! [`RiskObjective`]. The crate ships the manual mode ([`FixedThreshold`]) and
//! a bounded scalar minimizer ([`BoundedSearch`]); the risk estimator itself
//! (e.g. PGURE) is supplied by the caller.

use ndarray::{Array3, ArrayView3};

use crate::float_trait::SvtFloat;
use crate::window::WindowPlacement;

/// Default bracket width at which the bounded search stops.
const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Default cap on reconstructions per window.
const DEFAULT_MAX_EVALUATIONS: usize = 1000;

/// Windows are max-normalized, so thresholds above 1 remove everything.
const DEFAULT_UPPER: f64 = 1.0;

/// Scores a candidate reconstruction of a noisy window. Lower is better.
pub trait RiskObjective<F: SvtFloat>: Sync {
    fn risk(
        &self,
        placement: &WindowPlacement,
        noisy: ArrayView3<F>,
        candidate: ArrayView3<F>,
    ) -> f64;
}

impl<F, T> RiskObjective<F> for T
where
    F: SvtFloat,
    T: Fn(&WindowPlacement, ArrayView3<F>, ArrayView3<F>) -> f64 + Sync,
{
    fn risk(
        &self,
        placement: &WindowPlacement,
        noisy: ArrayView3<F>,
        candidate: ArrayView3<F>,
    ) -> f64 {
        self(placement, noisy, candidate)
    }
}

/// Pins a closure to the [`RiskObjective`] signature.
pub fn risk_fn<F, T>(f: T) -> T
where
    F: SvtFloat,
    T: Fn(&WindowPlacement, ArrayView3<F>, ArrayView3<F>) -> f64 + Sync,
{
    f
}

/// Result of a threshold search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome<F> {
    pub threshold: F,
    /// Reconstructions requested while searching.
    pub evaluations: usize,
}

/// Chooses a threshold for one window.
///
/// `noisy` is the normalized window that was decomposed; `reconstruct`
/// rebuilds it at a given threshold. Implementations are shared across
/// frame tasks and must not keep per-call state.
pub trait ThresholdSearch<F: SvtFloat>: Sync {
    fn search(
        &self,
        placement: &WindowPlacement,
        noisy: ArrayView3<F>,
        reconstruct: &mut dyn FnMut(F) -> Array3<F>,
    ) -> SearchOutcome<F>;
}

/// Manual mode: always the same threshold, no reconstructions.
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold<F> {
    threshold: F,
}

impl<F: SvtFloat> FixedThreshold<F> {
    pub fn new(threshold: F) -> Self {
        Self { threshold }
    }
}

impl<F: SvtFloat> ThresholdSearch<F> for FixedThreshold<F> {
    fn search(
        &self,
        _placement: &WindowPlacement,
        _noisy: ArrayView3<F>,
        _reconstruct: &mut dyn FnMut(F) -> Array3<F>,
    ) -> SearchOutcome<F> {
        SearchOutcome {
            threshold: self.threshold,
            evaluations: 0,
        }
    }
}

/// Golden-section minimization of a risk over `[lower, upper]`.
///
/// Assumes the risk is unimodal in the threshold. Stops when the bracket is
/// narrower than `tolerance` or after `max_evaluations` reconstructions, and
/// returns the best threshold it evaluated. NaN risks count as infinite.
#[derive(Debug, Clone)]
pub struct BoundedSearch<R> {
    objective: R,
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_evaluations: usize,
}

impl<R> BoundedSearch<R> {
    pub fn new(objective: R) -> Self {
        Self {
            objective,
            lower: 0.0,
            upper: DEFAULT_UPPER,
            tolerance: DEFAULT_TOLERANCE,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower.min(upper);
        self.upper = lower.max(upper);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    pub fn objective(&self) -> &R {
        &self.objective
    }
}

impl<F, R> ThresholdSearch<F> for BoundedSearch<R>
where
    F: SvtFloat,
    R: RiskObjective<F>,
{
    fn search(
        &self,
        placement: &WindowPlacement,
        noisy: ArrayView3<F>,
        reconstruct: &mut dyn FnMut(F) -> Array3<F>,
    ) -> SearchOutcome<F> {
        let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
        let (mut a, mut b) = (self.lower, self.upper);

        let mut evaluate = |t: f64| -> f64 {
            let candidate = reconstruct(F::from_f64_c(t));
            let risk = self.objective.risk(placement, noisy, candidate.view());
            if risk.is_nan() {
                f64::INFINITY
            } else {
                risk
            }
        };

        if self.max_evaluations < 2 || b - a <= self.tolerance {
            let mid = 0.5 * (a + b);
            let evaluations = if self.max_evaluations >= 1 {
                evaluate(mid);
                1
            } else {
                0
            };
            return SearchOutcome {
                threshold: F::from_f64_c(mid),
                evaluations,
            };
        }

        let mut c = b - inv_phi * (b - a);
        let mut d = a + inv_phi * (b - a);
        let mut fc = evaluate(c);
        let mut fd = evaluate(d);
        let mut evaluations = 2;

        while b - a > self.tolerance && evaluations < self.max_evaluations {
            if fc <= fd {
                b = d;
                d = c;
                fd = fc;
                c = b - inv_phi * (b - a);
                fc = evaluate(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + inv_phi * (b - a);
                fd = evaluate(d);
            }
            evaluations += 1;
        }

        let threshold = if fc <= fd { c } else { d };
        SearchOutcome {
            threshold: F::from_f64_c(threshold),
            evaluations,
        }
    }
}
