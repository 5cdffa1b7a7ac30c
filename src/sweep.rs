use crate::normal::{dot, NormalEquations};

/// Iterate of the sequential coordinate-wise algorithm.
///
/// Holds the solution `x` and the gradient `mu = H x + f` of the objective.
/// `mu` starts at `f` (since `x` starts at zero) and is only ever updated
/// incrementally, in the same step that moves a coordinate of `x`.
#[derive(Debug, Clone)]
pub struct CoordinateDescent<'a> {
    equations: &'a NormalEquations,
    x: Vec<f64>,
    gradient: Vec<f64>,
}

/// Summary of one sweep over all coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepOutcome {
    /// Number of coordinates that moved.
    pub changed: usize,
    /// Largest absolute coordinate step.
    pub max_step: f64,
}

impl<'a> CoordinateDescent<'a> {
    /// Starts at `x = 0`.
    pub fn new(equations: &'a NormalEquations) -> Self {
        Self {
            equations,
            x: vec![0.0; equations.ncols()],
            gradient: equations.linear().to_vec(),
        }
    }

    /// Updates every coordinate once, in index order.
    ///
    /// Coordinate `k` moves to the minimizer of `F` along `k`, projected onto
    /// `[0, inf)`. A zero diagonal entry yields NaN, which is not caught here.
    pub fn sweep(&mut self) -> SweepOutcome {
        let diag = self.equations.diag();
        let mut outcome = SweepOutcome {
            changed: 0,
            max_step: 0.0,
        };
        for k in 0..self.x.len() {
            let current = self.x[k];
            let candidate = current - self.gradient[k] / diag[k];
            // Not f64::max: NaN has to survive the projection.
            let next = if candidate < 0.0 { 0.0 } else { candidate };
            if next == current {
                continue;
            }
            self.x[k] = next;
            outcome.changed += 1;

            let delta = next - current;
            let step = delta.abs();
            if step > outcome.max_step {
                outcome.max_step = step;
            }
            for (mu, h) in self.gradient.iter_mut().zip(self.equations.gram_row(k)) {
                *mu += delta * h;
            }
        }
        outcome
    }

    /// Current coefficients.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Current gradient `H x + f`.
    pub fn gradient(&self) -> &[f64] {
        &self.gradient
    }

    /// Objective `F(x)`, using `x^T H x = x^T (mu - f)`.
    pub fn objective(&self) -> f64 {
        let mut sum = 0.0;
        for ((x, mu), f) in self
            .x
            .iter()
            .zip(&self.gradient)
            .zip(self.equations.linear())
        {
            sum += x * (mu + f);
        }
        0.5 * sum
    }

    /// Smallest gradient component; `+inf` when there are no coefficients.
    pub fn min_gradient(&self) -> f64 {
        self.gradient.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest deviation from the KKT conditions of `min F(x), x >= 0`.
    ///
    /// At zero coefficients only a negative gradient counts; at positive ones
    /// the whole gradient magnitude does.
    pub fn kkt_violation(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for (&x, &mu) in self.x.iter().zip(&self.gradient) {
            let v = if x > 0.0 { mu.abs() } else { (-mu).max(0.0) };
            worst = worst.max(v);
        }
        worst
    }

    /// `x^T f`.
    pub fn linear_value(&self) -> f64 {
        dot(&self.x, self.equations.linear())
    }

    pub fn into_solution(self) -> Vec<f64> {
        self.x
    }
}
