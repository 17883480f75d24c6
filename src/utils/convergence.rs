//! Convergence tracking & tolerance checks for the Jacobi sweep loop.

use crate::parallel::Comm;
use num_traits::Float;

/// Why the sweep loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The global error dropped to the tolerance or below.
    Converged,
    /// The iteration bound was reached first.
    IterationLimit,
    /// The global error stopped being a finite number.
    Diverged,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    pub reason: Termination,
}

/// Decision taken after each sweep.
#[derive(Clone, Debug, PartialEq)]
pub enum Step<T> {
    Continue,
    Stop(SolveStats<T>),
}

/// Stopping criteria & stats.
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: Option<usize>,
}

impl<T: Copy + Float> Convergence<T> {
    /// Decide after `iterations` completed sweeps whose last one moved
    /// the solution by `error`.
    pub fn check(&self, error: T, iterations: usize) -> Step<T> {
        let stop = |reason: Termination| {
            Step::Stop(SolveStats {
                iterations,
                final_residual: error,
                converged: reason == Termination::Converged,
                reason,
            })
        };
        if !error.is_finite() {
            stop(Termination::Diverged)
        } else if error <= self.tol {
            stop(Termination::Converged)
        } else if self.max_iters.is_some_and(|max| iterations >= max) {
            stop(Termination::IterationLimit)
        } else {
            Step::Continue
        }
    }
}

/// Global error measurement and reporting for one rank.
///
/// Every rank owns one; only the one built with `reporter = true` logs progress.
pub struct ConvergenceMonitor {
    pub conv: Convergence<f64>,
    pub report_every: usize,
    reporter: bool,
}

impl ConvergenceMonitor {
    pub fn new(tol: f64, max_iters: Option<usize>, report_every: usize, reporter: bool) -> Self {
        Self {
            conv: Convergence { tol, max_iters },
            report_every,
            reporter,
        }
    }

    /// Σ (x_new[j] − x[j])² over the owned rows.
    ///
    /// `x_new` holds the owned block only; `x` is the full replicated vector.
    pub fn local_error(x_new: &[f64], x: &[f64], start: usize) -> f64 {
        x_new
            .iter()
            .zip(&x[start..start + x_new.len()])
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Collective. Sum the local contributions over all ranks and take the square root.
    pub fn global_error<C: Comm>(&self, comm: &C, local: f64) -> f64 {
        comm.all_reduce(local).sqrt()
    }

    /// Decide after `sweep` (0-based) and report progress on the designated rank.
    pub fn check(&self, error: f64, sweep: usize) -> Step<f64> {
        if self.reporter && self.report_every > 0 && sweep % self.report_every == 0 {
            tracing::info!(iteration = sweep, error, "sweep");
        }
        self.conv.check(error, sweep + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_tolerance() {
        let conv = Convergence { tol: 1e-6, max_iters: None };
        assert_eq!(conv.check(1e-3, 5), Step::Continue);
        match conv.check(1e-6, 6) {
            Step::Stop(stats) => {
                assert!(stats.converged);
                assert_eq!(stats.iterations, 6);
                assert_eq!(stats.reason, Termination::Converged);
            }
            Step::Continue => panic!("expected to stop"),
        }
    }

    #[test]
    fn iteration_bound_and_divergence() {
        let conv = Convergence { tol: 1e-6, max_iters: Some(10) };
        assert_eq!(conv.check(1.0, 9), Step::Continue);
        assert!(matches!(
            conv.check(1.0, 10),
            Step::Stop(SolveStats { reason: Termination::IterationLimit, converged: false, .. })
        ));
        assert!(matches!(
            conv.check(f64::INFINITY, 1),
            Step::Stop(SolveStats { reason: Termination::Diverged, .. })
        ));
        assert!(matches!(
            conv.check(f64::NAN, 1),
            Step::Stop(SolveStats { reason: Termination::Diverged, .. })
        ));
    }

    #[test]
    fn local_error_uses_owned_rows_only() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let x_new = vec![2.0, 5.0];
        assert_eq!(ConvergenceMonitor::local_error(&x_new, &x, 1), 4.0);
        // last block: rows 2 and 3
        assert_eq!(ConvergenceMonitor::local_error(&[3.0, 7.0], &x, 2), 9.0);
        assert_eq!(ConvergenceMonitor::local_error(&[], &x, 4), 0.0);
    }

    #[test]
    fn monitor_counts_sweeps_from_one() {
        let monitor = ConvergenceMonitor::new(1e-8, Some(3), 1, false);
        assert_eq!(monitor.check(1.0, 1), Step::Continue);
        assert!(matches!(
            monitor.check(1.0, 2),
            Step::Stop(SolveStats { iterations: 3, reason: Termination::IterationLimit, .. })
        ));
    }
}
