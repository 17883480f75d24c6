//! Gauss-Jacobi solvers: the distributed engine and a serial reference.

use crate::utils::convergence::SolveStats;

/// Common interface for single-process solvers.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Solve A·x = b, writing result into `x`.
    /// Returns iteration stats (including convergence info).
    fn solve(&mut self, a: &M, b: &V, x: &mut V) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

pub mod gather;
pub mod jacobi;
pub mod reference;
pub mod sweep;

pub use jacobi::DistributedJacobi;
pub use reference::SerialJacobi;
