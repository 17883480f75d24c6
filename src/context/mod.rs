//! Context module for gauss-jacobi.
//!
//! This module provides the context type that ties a communicator, a coordinator and the solver
//! options together and drives a full run on one rank.
//!
//! Modules:
//! - [`jacobi_context`]: Contains the `JacobiContext` struct and the `Phase` state machine.
//!
//! # Example
//! ```rust
//! use gauss_jacobi::context::JacobiContext;
//! use gauss_jacobi::config::SolverOptions;
//! use gauss_jacobi::io::MemoryCoordinator;
//! use gauss_jacobi::matrix::{CsrMatrix, LinearSystem};
//! use gauss_jacobi::parallel::UniverseComm;
//!
//! let a = CsrMatrix::from_dense_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]]).unwrap();
//! let system = LinearSystem::new(a, vec![1.0, 2.0]).unwrap();
//! let mut ctx = JacobiContext::new(UniverseComm::Serial, MemoryCoordinator::new(system), SolverOptions::default());
//! let report = ctx.run().unwrap();
//! assert!(report.stats.converged);
//! ```
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM. §4.1 (Jacobi iteration).

pub mod jacobi_context;
pub use jacobi_context::{JacobiContext, Phase, SolveReport};
