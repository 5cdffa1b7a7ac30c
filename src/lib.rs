//! Non-negative least squares solved with the sequential coordinate-wise algorithm (SCA).
//!
//! This crate minimizes `||Ax - b||^2` subject to `x >= 0`. It follows Franc, Hlaváč
//! and Navara, "Sequential Coordinate-wise Algorithm for the Non-negative Least
//! Squares Problem" (CAIP 2005), and works on the normal equations only; there is
//! no QR or SVD.
//!
//! How it works (high level):
//! - Build `H = A^T A` and `f = -A^T b`, so the problem becomes
//!   `min 0.5 * x^T H x + x^T f` over `x >= 0`.
//! - Starting from `x = 0`, sweep the coordinates in order. Each one moves to
//!   its exact 1-D minimizer, clipped at zero.
//! - Keep the gradient `mu = H x + f` up to date in O(n) per coordinate move.
//! - After each sweep a `StoppingRule` decides whether to go on. A sweep that
//!   changes nothing, or the sweep limit, always ends the solve.
//!
//! Calling it:
//! - `solve_objective_gap`, `solve_kkt` and `solve_limit` cover the three
//!   built-in stopping rules and return `(x, sweeps)`.
//! - `solve` takes any `StoppingRule` plus `SolverOptions` and returns a
//!   `Solution` with `SolverStats`.
//!
//! Example:
//! ```rust
//! use sca_nnls::solve_kkt;
//!
//! let a = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
//! let b = [2.0, -1.0, 1.0];
//! let (x, sweeps) = solve_kkt(&a, &b, 1e-9).unwrap();
//! assert!(x.iter().all(|&v| v >= 0.0));
//! assert!(sweeps > 0);
//! ```

mod normal;
mod report;
mod solver;
mod stopping;
mod sweep;

pub use normal::{predict, NormalEquations};
pub use report::{Reporter, SolveStatus, SolverStats, StdoutReporter, SweepReport};
pub use solver::{
    nnls, solve, solve_kkt, solve_limit, solve_objective_gap, Solution, SolveError,
    SolverOptions, DEFAULT_SWEEP_LIMIT,
};
pub use stopping::{KktTolerance, ObjectiveGap, StoppingRule, SweepLimit};
pub use sweep::{CoordinateDescent, SweepOutcome};

pub use faer_core::Parallelism;
