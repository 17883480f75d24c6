//! Matrix module: CSR storage and the linear systems built on it.

pub mod sparse;
pub use sparse::{CsrMatrix, LinearSystem};
