//! Core traits shared by matrices and solvers.

pub mod traits;
