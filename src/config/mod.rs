//! Configuration: solver options and the default tolerance.

pub mod options;
pub use options::{DEFAULT_MAX_ITERS, EPSILON, InputForm, PartitionPolicy, SolverOptions};
