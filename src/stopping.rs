//! Stopping rules evaluated after every sweep.
//!
//! All rules share the same update; they only decide when a solve may end.
//! The driver itself stops when a sweep changes nothing or the sweep limit is
//! reached, whatever the rule says.

use crate::normal::{dot, NormalEquations};
use crate::sweep::CoordinateDescent;

/// Decides after each sweep whether the current iterate is good enough.
pub trait StoppingRule {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Called once after Setup, before the first sweep.
    fn prepare(&mut self, _equations: &NormalEquations) {}

    /// Called after every sweep that moved at least one coordinate.
    fn is_satisfied(
        &mut self,
        equations: &NormalEquations,
        state: &CoordinateDescent<'_>,
    ) -> bool;

    /// Overrides `SolverOptions::max_sweeps` when set.
    fn sweep_limit(&self) -> Option<usize> {
        None
    }
}

/// Stops when the gap between the objective and a lower bound is within `delta`.
///
/// With `ub` an upper bound on the sum of the optimal coefficients, the optimum
/// is bounded below by `ub * min(mu) - 0.5 * x^T H x`. The rule stops when
/// `F(x)` minus that bound, i.e. `x^T H x + x^T f - ub * min(mu)`, is at most
/// `delta`. Costs a dense `H x` per check.
#[derive(Debug, Clone)]
pub struct ObjectiveGap {
    delta: f64,
    bound: f64,
    hx: Vec<f64>,
}

impl ObjectiveGap {
    pub fn new(delta: f64) -> Self {
        Self {
            delta,
            bound: 0.0,
            hx: Vec::new(),
        }
    }

    /// Gap at `state`, using the `H x` of the last check.
    pub(crate) fn gap(&self, state: &CoordinateDescent<'_>) -> f64 {
        let xhx = dot(state.x(), &self.hx);
        xhx + state.linear_value() - self.bound * state.min_gradient()
    }
}

impl StoppingRule for ObjectiveGap {
    fn name(&self) -> &'static str {
        "objective-gap"
    }

    fn prepare(&mut self, equations: &NormalEquations) {
        self.bound = equations.solution_bound();
        self.hx = vec![0.0; equations.ncols()];
    }

    fn is_satisfied(
        &mut self,
        equations: &NormalEquations,
        state: &CoordinateDescent<'_>,
    ) -> bool {
        equations.gram_apply(state.x(), &mut self.hx);
        self.gap(state) <= self.delta
    }
}

/// Stops when the gradient satisfies the KKT conditions within `epsilon`.
///
/// Optimal points have `mu[k] >= -epsilon` everywhere and `|mu[k]| <= epsilon`
/// wherever `x[k] > 0`. O(n) per check.
#[derive(Debug, Clone, Copy)]
pub struct KktTolerance {
    epsilon: f64,
}

impl KktTolerance {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl StoppingRule for KktTolerance {
    fn name(&self) -> &'static str {
        "kkt"
    }

    fn is_satisfied(
        &mut self,
        _equations: &NormalEquations,
        state: &CoordinateDescent<'_>,
    ) -> bool {
        let lower = -self.epsilon;
        for (&x, &mu) in state.x().iter().zip(state.gradient()) {
            if x < 0.0 || mu < lower || (x > 0.0 && mu > self.epsilon) {
                return false;
            }
        }
        true
    }
}

/// Never satisfied; only the sweep limit or a sweep without change ends the solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepLimit {
    max_sweeps: Option<usize>,
}

impl SweepLimit {
    /// `None` falls back to `SolverOptions::max_sweeps`.
    pub fn new(max_sweeps: Option<usize>) -> Self {
        Self { max_sweeps }
    }
}

impl StoppingRule for SweepLimit {
    fn name(&self) -> &'static str {
        "sweep-limit"
    }

    fn is_satisfied(
        &mut self,
        _equations: &NormalEquations,
        _state: &CoordinateDescent<'_>,
    ) -> bool {
        false
    }

    fn sweep_limit(&self) -> Option<usize> {
        self.max_sweeps
    }
}
