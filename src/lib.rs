//! gauss-jacobi: distributed Gauss-Jacobi iteration for sparse linear systems
//!
//! The rows of a CSR matrix are split into contiguous blocks, one per rank. Every rank keeps a
//! full copy of the solution vector, updates its own rows from the previous iterate, and the
//! copies are brought back into agreement after each sweep by an all-gather. Ranks are MPI
//! processes (feature `mpi`) or threads of one process.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod io;
pub mod matrix;
pub mod partition;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use error::*;
pub use matrix::*;
pub use partition::{BlockLayout, LocalBlock, Partitioner, ProblemSizes};
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
