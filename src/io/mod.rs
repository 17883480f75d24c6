//! Input/output around the solver: file formats and the coordinator role.

pub mod coordinator;
pub mod format;

pub use coordinator::{Coordinator, FileCoordinator, MemoryCoordinator};
pub use format::{load_matrix, load_vector, write_vector};
