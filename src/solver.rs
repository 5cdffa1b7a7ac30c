use core::fmt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use faer_core::Parallelism;

use crate::normal::NormalEquations;
use crate::report::{emit_line, Reporter, SolveStatus, SolverStats, StdoutReporter, SweepReport};
use crate::stopping::{KktTolerance, ObjectiveGap, StoppingRule, SweepLimit};
use crate::sweep::CoordinateDescent;

/// Sweep limit used when neither the options nor the rule give one.
pub const DEFAULT_SWEEP_LIMIT: usize = 10_000_000;

/// Errors raised before any computation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// A has a different number of rows than b has entries.
    DimensionMismatch { rows: usize, observations: usize },
    /// A row of A differs in length from the first row.
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { rows, observations } => {
                write!(f, "A has {rows} rows but b has {observations} entries")
            }
            Self::RaggedRow {
                row,
                expected,
                actual,
            } => {
                write!(f, "row {row} has length {actual}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for SolveError {}

/// Options shared by every stopping rule.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Maximum number of sweeps, unless the rule sets its own.
    pub max_sweeps: usize,
    /// Where Setup and dense `H x` products run.
    pub parallelism: Parallelism,
    /// Checked before every sweep; a raised flag ends the solve.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Emit a sweep table and the elapsed time to stdout by default.
    pub verbose: bool,
    /// Row stride of the verbose sweep table.
    pub report_every: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_sweeps: DEFAULT_SWEEP_LIMIT,
            parallelism: Parallelism::None,
            cancel: None,
            verbose: false,
            report_every: 1,
        }
    }
}

/// Coefficients and how they were reached.
#[derive(Debug, Clone)]
pub struct Solution {
    pub x: Vec<f64>,
    pub stats: SolverStats,
}

enum ReporterSlot<'a> {
    External(&'a mut dyn Reporter),
    Local(StdoutReporter),
    None,
}

impl<'a> ReporterSlot<'a> {
    fn new(reporter: Option<&'a mut dyn Reporter>, options: &SolverOptions) -> Self {
        match reporter {
            Some(r) => Self::External(r),
            None if options.verbose => {
                Self::Local(StdoutReporter::with_stride(options.report_every))
            }
            None => Self::None,
        }
    }

    fn as_mut(&mut self) -> Option<&mut dyn Reporter> {
        match self {
            Self::External(r) => Some(*r),
            Self::Local(r) => Some(r),
            Self::None => None,
        }
    }
}

/// Solves `min ||Ax - b||^2` subject to `x >= 0` by sequential coordinate descent.
///
/// `a` is given row by row. Each sweep updates every coordinate once, then
/// the solve ends when a sweep changes nothing, when `rule` is satisfied, or
/// when the sweep limit is reached. Columns of `a` must not be all zero: the
/// update divides by `(A^T A)_kk` and NaN then spreads through the result.
pub fn solve<R: AsRef<[f64]>>(
    a: &[R],
    b: &[f64],
    rule: &mut impl StoppingRule,
    options: &SolverOptions,
    reporter: Option<&mut dyn Reporter>,
) -> Result<Solution, SolveError> {
    let equations = NormalEquations::new(a, b, options.parallelism)?;
    let start_time = options.verbose.then(Instant::now);
    let mut reporter = ReporterSlot::new(reporter, options);

    let limit = rule.sweep_limit().unwrap_or(options.max_sweeps);
    log::debug!(
        "sca: {} rows, {} columns, rule {}, limit {limit}",
        a.len(),
        equations.ncols(),
        rule.name()
    );
    rule.prepare(&equations);

    let mut state = CoordinateDescent::new(&equations);
    let mut status = SolveStatus::MaxSweeps;
    let mut iterations = 0;

    while iterations < limit {
        if is_cancelled(options) {
            status = SolveStatus::Cancelled;
            break;
        }
        let outcome = state.sweep();
        iterations += 1;

        if let Some(reporter) = reporter.as_mut() {
            reporter.on_sweep(&SweepReport {
                sweep: iterations,
                changed: outcome.changed,
                max_step: outcome.max_step,
                objective: state.objective(),
                min_gradient: state.min_gradient(),
            });
        }

        if outcome.changed == 0 {
            status = SolveStatus::ConvergedNoChange;
            break;
        }
        if rule.is_satisfied(&equations, &state) {
            status = SolveStatus::ConvergedCriterion;
            break;
        }
    }

    let stats = SolverStats {
        status,
        iterations,
        objective: state.objective(),
        kkt_violation: state.kkt_violation(),
    };
    log::debug!("sca: {:?} after {} sweeps", stats.status, stats.iterations);
    let x = state.into_solution();
    Ok(finish(Solution { x, stats }, start_time, &mut reporter))
}

/// Stops when the objective is within `delta` of its lower bound.
///
/// Returns the coefficients and the number of sweeps.
pub fn solve_objective_gap<R: AsRef<[f64]>>(
    a: &[R],
    b: &[f64],
    delta: f64,
) -> Result<(Vec<f64>, usize), SolveError> {
    let options = SolverOptions::default();
    let solution = solve(a, b, &mut ObjectiveGap::new(delta), &options, None)?;
    Ok((solution.x, solution.stats.iterations))
}

/// Stops when the KKT conditions hold within `epsilon`.
///
/// Each check is O(n) instead of the O(n^2) of [`solve_objective_gap`], but
/// `epsilon` says less about the distance to the optimum.
pub fn solve_kkt<R: AsRef<[f64]>>(
    a: &[R],
    b: &[f64],
    epsilon: f64,
) -> Result<(Vec<f64>, usize), SolveError> {
    let options = SolverOptions::default();
    let solution = solve(a, b, &mut KktTolerance::new(epsilon), &options, None)?;
    Ok((solution.x, solution.stats.iterations))
}

/// Stops after `max_sweeps` sweeps (`None`: [`DEFAULT_SWEEP_LIMIT`]) or when
/// a sweep changes nothing.
pub fn solve_limit<R: AsRef<[f64]>>(
    a: &[R],
    b: &[f64],
    max_sweeps: Option<usize>,
) -> Result<(Vec<f64>, usize), SolveError> {
    let options = SolverOptions::default();
    let solution = solve(a, b, &mut SweepLimit::new(max_sweeps), &options, None)?;
    Ok((solution.x, solution.stats.iterations))
}

/// Sweeps until nothing changes, up to [`DEFAULT_SWEEP_LIMIT`].
pub fn nnls<R: AsRef<[f64]>>(a: &[R], b: &[f64]) -> Result<(Vec<f64>, usize), SolveError> {
    solve_limit(a, b, None)
}

fn is_cancelled(options: &SolverOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.3} s", secs)
    } else if secs >= 1e-3 {
        format!("{:.3} ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3} us", secs * 1e6)
    } else {
        format!("{:.0} ns", secs * 1e9)
    }
}

fn finish(
    solution: Solution,
    start_time: Option<Instant>,
    reporter: &mut ReporterSlot<'_>,
) -> Solution {
    if let Some(reporter) = reporter.as_mut() {
        reporter.on_finish();
    }
    if let Some(start) = start_time {
        let elapsed = format_duration(start.elapsed());
        emit_line(&format!(
            "status: {:?}, sweeps: {}, time: {elapsed}",
            solution.stats.status, solution.stats.iterations
        ));
    }
    solution
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        sweeps: Vec<usize>,
        finished: bool,
    }

    impl Reporter for Recorder {
        fn on_sweep(&mut self, report: &SweepReport) {
            self.sweeps.push(report.sweep);
        }

        fn on_finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn reports_every_sweep() {
        let a = [[1.0, 0.3], [0.2, 1.0], [0.4, 0.1]];
        let b = [1.0, 0.5, 0.2];
        let mut recorder = Recorder {
            sweeps: Vec::new(),
            finished: false,
        };
        let solution = solve(
            &a,
            &b,
            &mut SweepLimit::new(Some(4)),
            &SolverOptions::default(),
            Some(&mut recorder),
        )
        .unwrap();
        assert_eq!(solution.stats.iterations, 4);
        assert_eq!(solution.stats.status, SolveStatus::MaxSweeps);
        assert_eq!(recorder.sweeps, vec![1, 2, 3, 4]);
        assert!(recorder.finished);
    }

    #[test]
    fn zero_limit_returns_origin() {
        let a = [[1.0], [2.0]];
        let b = [1.0, 1.0];
        let (x, iterations) = solve_limit(&a, &b, Some(0)).unwrap();
        assert_eq!(x, vec![0.0]);
        assert_eq!(iterations, 0);
    }

    #[test]
    fn empty_problem_stops_after_one_sweep() {
        let a: [[f64; 0]; 0] = [];
        let solution = solve(
            &a,
            &[],
            &mut ObjectiveGap::new(1e-9),
            &SolverOptions::default(),
            None,
        )
        .unwrap();
        assert!(solution.x.is_empty());
        assert_eq!(solution.stats.iterations, 1);
        assert_eq!(solution.stats.status, SolveStatus::ConvergedNoChange);
    }

    #[test]
    fn error_messages() {
        let err = SolveError::DimensionMismatch {
            rows: 3,
            observations: 2,
        };
        assert_eq!(err.to_string(), "A has 3 rows but b has 2 entries");
        let err = SolveError::RaggedRow {
            row: 1,
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "row 1 has length 2, expected 3");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500 s");
        assert_eq!(format_duration(Duration::from_micros(2500)), "2.500 ms");
        assert_eq!(format_duration(Duration::from_nanos(40)), "40 ns");
    }
}
