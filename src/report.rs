use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets};

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The stopping rule was satisfied.
    ConvergedCriterion,
    /// A sweep left every coordinate unchanged.
    ConvergedNoChange,
    /// The sweep limit was reached.
    MaxSweeps,
    /// The cancel flag was raised before a sweep.
    Cancelled,
}

impl SolveStatus {
    pub fn is_converged(self) -> bool {
        matches!(self, Self::ConvergedCriterion | Self::ConvergedNoChange)
    }
}

#[derive(Debug, Clone)]
pub struct SolverStats {
    pub status: SolveStatus,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// `0.5 * x^T H x + x^T f`, i.e. `0.5 * (||Ax - b||^2 - ||b||^2)`.
    pub objective: f64,
    pub kkt_violation: f64,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep: usize,
    pub changed: usize,
    pub max_step: f64,
    pub objective: f64,
    pub min_gradient: f64,
}

pub(crate) fn emit_line(line: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{line}");
    } else {
        println!("{line}");
    }
}

pub trait Reporter {
    fn on_sweep(&mut self, report: &SweepReport);
    fn on_finish(&mut self) {}
}

/// Collects sweep rows and prints them as one table when the solve ends.
///
/// Only every `stride`-th sweep is kept, plus the most recent one, so that
/// long solves stay readable.
pub struct StdoutReporter {
    stride: usize,
    rows: Vec<SweepReport>,
    last: Option<SweepReport>,
}

impl StdoutReporter {
    pub fn new() -> Self {
        Self::with_stride(1)
    }

    pub fn with_stride(stride: usize) -> Self {
        Self {
            stride: stride.max(1),
            rows: Vec::new(),
            last: None,
        }
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for StdoutReporter {
    fn on_sweep(&mut self, report: &SweepReport) {
        if report.sweep % self.stride == 0 || report.sweep == 1 {
            self.rows.push(report.clone());
            self.last = None;
        } else {
            self.last = Some(report.clone());
        }
    }

    fn on_finish(&mut self) {
        if let Some(last) = self.last.take() {
            self.rows.push(last);
        }
        if self.rows.is_empty() {
            return;
        }
        if !log::log_enabled!(log::Level::Info) {
            println!();
        }
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("sweep").set_alignment(CellAlignment::Right),
            Cell::new("changed").set_alignment(CellAlignment::Right),
            Cell::new("step").set_alignment(CellAlignment::Right),
            Cell::new("objective").set_alignment(CellAlignment::Right),
            Cell::new("min grad").set_alignment(CellAlignment::Right),
        ]);
        for row in &self.rows {
            table.add_row(vec![
                Cell::new(row.sweep).set_alignment(CellAlignment::Right),
                Cell::new(row.changed).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1e}", row.max_step)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.6e}", row.objective)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1e}", row.min_gradient)).set_alignment(CellAlignment::Right),
            ]);
        }

        for line in table.to_string().lines() {
            emit_line(line);
        }
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(sweep: usize) -> SweepReport {
        SweepReport {
            sweep,
            changed: 1,
            max_step: 0.5,
            objective: -1.0,
            min_gradient: 0.0,
        }
    }

    #[test]
    fn stride_keeps_first_and_last_rows() {
        let mut reporter = StdoutReporter::with_stride(10);
        for sweep in 1..=23 {
            reporter.on_sweep(&report(sweep));
        }
        let kept: Vec<usize> = reporter.rows.iter().map(|r| r.sweep).collect();
        assert_eq!(kept, vec![1, 10, 20]);
        assert_eq!(reporter.last.as_ref().map(|r| r.sweep), Some(23));

        reporter.on_finish();
        assert!(reporter.rows.is_empty());
        assert!(reporter.last.is_none());
    }
}
