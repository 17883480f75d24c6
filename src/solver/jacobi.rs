//! The distributed sweep loop: sweep, measure, exchange, decide.

use crate::config::SolverOptions;
use crate::parallel::Comm;
use crate::partition::{BlockLayout, LocalBlock};
use crate::solver::{gather::gather, sweep::sweep};
use crate::utils::convergence::{ConvergenceMonitor, SolveStats, Step};

/// Gauss-Jacobi iteration over row blocks, one instance per rank.
///
/// All ranks must call [`DistributedJacobi::solve`] together with identical
/// starting vectors. Within a sweep every rank goes through the same order:
/// local row update, local error, global error reduction, vector exchange.
pub struct DistributedJacobi<'a, C: Comm> {
    comm: &'a C,
    layout: &'a BlockLayout,
    block: &'a LocalBlock,
    monitor: ConvergenceMonitor,
}

impl<'a, C: Comm> DistributedJacobi<'a, C> {
    pub fn new(
        comm: &'a C,
        layout: &'a BlockLayout,
        block: &'a LocalBlock,
        options: &SolverOptions,
    ) -> Self {
        let monitor = ConvergenceMonitor::new(
            options.tol,
            options.max_iters,
            options.report_every,
            comm.is_root(),
        );
        Self { comm, layout, block, monitor }
    }

    /// Collective. Iterate from `x` until the global error is within tolerance
    /// or the loop gives up; `x` then holds the last gathered iterate on every rank.
    pub fn solve(&self, x: &mut [f64]) -> SolveStats<f64> {
        assert_eq!(x.len(), self.layout.n(), "x must be the full replicated vector");
        let mut x_new = vec![0.0; self.block.count()];
        let mut index = 0;
        loop {
            sweep(self.block, x, &mut x_new);
            let local = ConvergenceMonitor::local_error(&x_new, x, self.block.start());
            let error = self.monitor.global_error(self.comm, local);
            // the decision is already fixed; the exchange runs on the final sweep too
            gather(self.comm, self.layout, &x_new, x);
            match self.monitor.check(error, index) {
                Step::Continue => index += 1,
                Step::Stop(stats) => return stats,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionPolicy;
    use crate::matrix::{CsrMatrix, LinearSystem};
    use crate::parallel::ThreadComm;
    use crate::partition::{Partitioner, ProblemSizes};
    use crate::utils::convergence::Termination;
    use approx::assert_abs_diff_eq;

    fn solve_on(ranks: usize, system: &LinearSystem, options: &SolverOptions) -> Vec<(Vec<f64>, SolveStats<f64>)> {
        let iteration = system.jacobi_iteration().unwrap();
        let sizes = ProblemSizes::of(&iteration);
        ThreadComm::run(ranks, |comm| {
            let held = if comm.is_root() { Some(&iteration) } else { None };
            let (layout, block) = Partitioner::new(options.partition)
                .distribute(&comm, sizes, held)
                .unwrap();
            let mut x = vec![0.0; sizes.n];
            let stats = DistributedJacobi::new(&comm, &layout, &block, options).solve(&mut x);
            (x, stats)
        })
    }

    #[test]
    fn two_by_two_on_one_and_two_ranks() {
        // 4x0 + x1 = 1, 2x0 + 3x1 = 2  =>  x = [0.1, 0.6]
        let a = CsrMatrix::from_dense_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]]).unwrap();
        let system = LinearSystem::new(a, vec![1.0, 2.0]).unwrap();
        let options = SolverOptions::default();
        let single = solve_on(1, &system, &options);
        let pair = solve_on(2, &system, &options);
        for (x, stats) in single.iter().chain(&pair) {
            assert!(stats.converged);
            assert_abs_diff_eq!(x[0], 0.1, epsilon = 1e-9);
            assert_abs_diff_eq!(x[1], 0.6, epsilon = 1e-9);
        }
        assert_eq!(single[0].1.iterations, pair[0].1.iterations);
        assert_eq!(pair[0].0, pair[1].0);
    }

    #[test]
    fn gives_up_at_the_iteration_bound() {
        // not diagonally dominant: Jacobi diverges
        let a = CsrMatrix::from_dense_rows(&[vec![1.0, 3.0], vec![3.0, 1.0]]).unwrap();
        let system = LinearSystem::new(a, vec![1.0, 1.0]).unwrap();
        let options = SolverOptions::new(1e-10, Some(25));
        for (_, stats) in solve_on(2, &system, &options) {
            assert!(!stats.converged);
            assert_eq!(stats.reason, Termination::IterationLimit);
            assert_eq!(stats.iterations, 25);
        }
    }

    #[test]
    fn uneven_rows_are_all_updated() {
        let n: usize = 7;
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 5.0 } else if i.abs_diff(j) == 1 { 1.0 } else { 0.0 }).collect())
            .collect();
        let a = CsrMatrix::from_dense_rows(&rows).unwrap();
        let x_true: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let mut b = vec![0.0; n];
        a.spmv(&x_true, &mut b);
        let system = LinearSystem::new(a, b).unwrap();
        let options = SolverOptions::default().with_partition(PartitionPolicy::Balanced);
        for (x, stats) in solve_on(3, &system, &options) {
            assert!(stats.converged);
            for (xi, ti) in x.iter().zip(&x_true) {
                assert_abs_diff_eq!(*xi, *ti, epsilon = 1e-8);
            }
        }
    }
}
