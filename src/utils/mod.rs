//! Utilities: convergence tracking.

pub mod convergence;
pub use convergence::{Convergence, ConvergenceMonitor, SolveStats, Step, Termination};
