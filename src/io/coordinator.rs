//! The coordinator role: sequential I/O performed by the root rank.
//!
//! Implementors only supply the root-local steps ([`Coordinator::read_system`]
//! and [`Coordinator::write_vector`]). The provided methods are collective:
//! every rank calls them, only the root does the I/O, and the outcome is
//! broadcast so that a failure on the root makes every rank return an error
//! instead of blocking in the next collective.

use crate::error::JError;
use crate::io::format;
use crate::matrix::LinearSystem;
use crate::parallel::{Comm, ROOT, agree};
use crate::partition::ProblemSizes;
use std::path::PathBuf;

pub trait Coordinator {
    /// Root only: read the system.
    fn read_system(&mut self) -> Result<LinearSystem, JError>;

    /// Root only: store the solution.
    fn write_vector(&mut self, x: &[f64]) -> Result<(), JError>;

    /// Collective. The root gets `Some(system)`, the other ranks `None`.
    fn load<C: Comm>(&mut self, comm: &C) -> Result<Option<LinearSystem>, JError> {
        let local = if comm.is_root() {
            self.read_system().map(Some)
        } else {
            Ok(None)
        };
        agree(comm, local, ROOT)
    }

    /// Collective. Announce the sizes of the root's system to every rank.
    fn broadcast_sizes<C: Comm>(&self, comm: &C, system: Option<&LinearSystem>) -> ProblemSizes {
        let sizes = system.map(ProblemSizes::of).unwrap_or_default();
        let mut buf = [sizes.n, sizes.nnz, sizes.rhs_len];
        comm.broadcast(&mut buf, ROOT);
        ProblemSizes { n: buf[0], nnz: buf[1], rhs_len: buf[2] }
    }

    /// Collective. The root writes `x`; all ranks learn whether it worked.
    fn write_result<C: Comm>(&mut self, comm: &C, x: &[f64]) -> Result<(), JError> {
        let local = if comm.is_root() { self.write_vector(x) } else { Ok(()) };
        agree(comm, local, ROOT)
    }
}

/// Reads `A` and `b` from files and writes `x` to a file.
#[derive(Debug, Clone)]
pub struct FileCoordinator {
    pub matrix: PathBuf,
    pub rhs: PathBuf,
    pub output: PathBuf,
}

impl FileCoordinator {
    pub fn new(matrix: impl Into<PathBuf>, rhs: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { matrix: matrix.into(), rhs: rhs.into(), output: output.into() }
    }
}

impl Coordinator for FileCoordinator {
    fn read_system(&mut self) -> Result<LinearSystem, JError> {
        let matrix = format::load_matrix(&self.matrix)?;
        tracing::info!(path = %self.matrix.display(), n = matrix.n(), nnz = matrix.nnz(), "read matrix");
        let rhs = format::load_vector(&self.rhs)?;
        tracing::info!(path = %self.rhs.display(), n = rhs.len(), "read vector");
        LinearSystem::new(matrix, rhs)
    }

    fn write_vector(&mut self, x: &[f64]) -> Result<(), JError> {
        tracing::info!(path = %self.output.display(), n = x.len(), "writing solution");
        format::write_vector(&self.output, x)
    }
}

/// Hands over an in-memory system and keeps the solution.
#[derive(Debug, Clone, Default)]
pub struct MemoryCoordinator {
    pub input: Option<LinearSystem>,
    pub output: Option<Vec<f64>>,
}

impl MemoryCoordinator {
    pub fn new(system: LinearSystem) -> Self {
        Self { input: Some(system), output: None }
    }

    /// A coordinator for ranks that never read: every rank but the root.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Coordinator for MemoryCoordinator {
    fn read_system(&mut self) -> Result<LinearSystem, JError> {
        self.input
            .clone()
            .ok_or_else(|| JError::InvalidMatrix("no system was supplied to the coordinator".into()))
    }

    fn write_vector(&mut self, x: &[f64]) -> Result<(), JError> {
        self.output = Some(x.to_vec());
        Ok(())
    }
}
