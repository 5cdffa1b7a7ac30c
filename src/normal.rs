use faer_core::{Mat, Parallelism};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::solver::SolveError;

/// Normal-equations form of an NNLS problem.
///
/// Minimizing `||Ax - b||^2` over `x >= 0` is equivalent to minimizing
/// `F(x) = 0.5 * x^T H x + x^T f` with `H = A^T A` and `f = -A^T b`.
/// Everything is built from scratch for each solve and owned by it.
#[derive(Debug)]
pub struct NormalEquations {
    gram: Mat<f64>,
    diag: Vec<f64>,
    linear: Vec<f64>,
    workers: Workers,
}

impl NormalEquations {
    /// Builds `H`, its diagonal and `f` from row-major `a` and `b`.
    ///
    /// Requirements:
    /// - `a.len() == b.len()`
    /// - every row has the length of the first row
    ///
    /// Each entry of `H` and `f` is a sequential sum over the rows of `a`, so the
    /// result does not depend on `parallelism`.
    pub fn new<R: AsRef<[f64]>>(
        a: &[R],
        b: &[f64],
        parallelism: Parallelism,
    ) -> Result<Self, SolveError> {
        let (m, n) = check_dimensions(a, b)?;
        let workers = Workers::new(parallelism);

        // Column-major copy so that columns of A are contiguous.
        let design = Mat::<f64>::from_fn(m, n, |i, j| a[i].as_ref()[j]);

        let linear = workers.map_columns(n, |j| -dot(b, design.col_as_slice(j)));

        // Upper triangle only, one column at a time; mirrored below.
        let upper = workers.map_columns(n, |j| {
            let col_j = design.col_as_slice(j);
            (0..=j)
                .map(|i| dot(design.col_as_slice(i), col_j))
                .collect::<Vec<f64>>()
        });
        let gram = Mat::<f64>::from_fn(n, n, |i, j| {
            if i <= j {
                upper[j][i]
            } else {
                upper[i][j]
            }
        });
        let diag = (0..n).map(|k| upper[k][k]).collect();

        Ok(Self {
            gram,
            diag,
            linear,
            workers,
        })
    }

    /// Number of coefficients (columns of A).
    pub fn ncols(&self) -> usize {
        self.diag.len()
    }

    /// The Gram matrix `H = A^T A`.
    pub fn gram(&self) -> &Mat<f64> {
        &self.gram
    }

    /// Row `k` of `H`; equal to column `k` by symmetry.
    pub fn gram_row(&self, k: usize) -> &[f64] {
        self.gram.col_as_slice(k)
    }

    /// Diagonal of `H`.
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    /// Linear term `f = -A^T b`.
    pub fn linear(&self) -> &[f64] {
        &self.linear
    }

    /// Writes `H x` into `out` with a dense product.
    pub fn gram_apply(&self, x: &[f64], out: &mut [f64]) {
        let gram = &self.gram;
        self.workers.run(|parallel| {
            if parallel {
                out.par_iter_mut()
                    .enumerate()
                    .for_each(|(i, o)| *o = dot(gram.col_as_slice(i), x));
            } else {
                for (i, o) in out.iter_mut().enumerate() {
                    *o = dot(gram.col_as_slice(i), x);
                }
            }
        });
    }

    /// Objective `F(x) = 0.5 * x^T H x + x^T f`, evaluated densely.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let mut hx = vec![0.0; self.ncols()];
        self.gram_apply(x, &mut hx);
        0.5 * dot(x, &hx) + dot(x, &self.linear)
    }

    /// Upper bound on the sum of the optimal coefficients.
    ///
    /// Sum over columns of the unconstrained one-coefficient fits
    /// `(A^T b)_i / (A^T A)_ii`, keeping only the positive ones.
    pub fn solution_bound(&self) -> f64 {
        let mut bound = 0.0;
        for (f, d) in self.linear.iter().zip(&self.diag) {
            let u = -f / d;
            if u > 0.0 {
                bound += u;
            }
        }
        bound
    }
}

/// Fitted values `A x`, one per row of `a`.
pub fn predict<R: AsRef<[f64]>>(a: &[R], x: &[f64]) -> Result<Vec<f64>, SolveError> {
    let mut fitted = Vec::with_capacity(a.len());
    for (row, values) in a.iter().enumerate() {
        let values = values.as_ref();
        if values.len() != x.len() {
            return Err(SolveError::RaggedRow {
                row,
                expected: x.len(),
                actual: values.len(),
            });
        }
        fitted.push(dot(values, x));
    }
    Ok(fitted)
}

fn check_dimensions<R: AsRef<[f64]>>(a: &[R], b: &[f64]) -> Result<(usize, usize), SolveError> {
    let m = a.len();
    if b.len() != m {
        return Err(SolveError::DimensionMismatch {
            rows: m,
            observations: b.len(),
        });
    }
    let n = a.first().map_or(0, |row| row.as_ref().len());
    for (row, values) in a.iter().enumerate() {
        let actual = values.as_ref().len();
        if actual != n {
            return Err(SolveError::RaggedRow {
                row,
                expected: n,
                actual,
            });
        }
    }
    Ok((m, n))
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        sum += x * y;
    }
    sum
}

/// Where the column reductions of Setup and `H x` run.
#[derive(Debug)]
enum Workers {
    Sequential,
    Global,
    Pool(ThreadPool),
}

impl Workers {
    #[allow(unreachable_patterns)]
    fn new(parallelism: Parallelism) -> Self {
        match parallelism {
            Parallelism::None => Self::Sequential,
            Parallelism::Rayon(0) => Self::Global,
            Parallelism::Rayon(threads) => {
                match ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => Self::Pool(pool),
                    Err(err) => {
                        log::warn!("falling back to sequential setup: {err}");
                        Self::Sequential
                    }
                }
            }
            _ => Self::Sequential,
        }
    }

    fn run<T: Send>(&self, op: impl FnOnce(bool) -> T + Send) -> T {
        match self {
            Self::Sequential => op(false),
            Self::Global => op(true),
            Self::Pool(pool) => pool.install(|| op(true)),
        }
    }

    fn map_columns<T: Send>(&self, n: usize, f: impl Fn(usize) -> T + Sync + Send) -> Vec<T> {
        self.run(|parallel| {
            if parallel {
                (0..n).into_par_iter().map(&f).collect()
            } else {
                (0..n).map(&f).collect()
            }
        })
    }
}
