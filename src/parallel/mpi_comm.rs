//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. Each rank of the job is a separate OS process; the
//! collectives used by the engine map one-to-one onto MPI calls:
//!
//! | `Comm` method         | MPI call          |
//! |-----------------------|-------------------|
//! | `broadcast`           | `MPI_Bcast`       |
//! | `scatter_varcount`    | `MPI_Scatterv`    |
//! | `all_gather_varcount` | `MPI_Allgatherv`  |
//! | `all_reduce`          | `MPI_Allreduce` (sum) |
//!
//! The implementation is only available when the `mpi` feature is enabled.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use gauss_jacobi::parallel::{Comm, MpiComm};
//! let comm = MpiComm::init().unwrap();
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use crate::error::JError;
use crate::parallel::Payload;
use mpi::Count;
use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

/// MPI communicator wrapper for distributed parallelism.
///
/// Holds the MPI universe (finalized on drop), the world communicator, the rank of the current
/// process, and the total number of processes.
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Fails if MPI was already initialized in this process.
    pub fn init() -> Result<Self, JError> {
        let universe = mpi::initialize()
            .ok_or_else(|| JError::Comm("MPI is already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

/// Callers stay within [`super::Comm::max_count`]; anything larger is a bug.
fn to_counts(v: &[usize]) -> Vec<Count> {
    v.iter()
        .map(|&c| Count::try_from(c).unwrap_or_else(|_| panic!("count {c} exceeds the MPI count range")))
        .collect()
}

impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize {
        self.rank
    }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize {
        self.size
    }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) {
        self.world.barrier();
    }

    fn broadcast<T: Payload>(&self, buf: &mut [T], root: usize) {
        self.world.process_at_rank(root as i32).broadcast_into(buf);
    }

    /// Distributes variable-length windows of a global array (scatterv).
    ///
    /// - `send`: The full array (only read on the root process).
    /// - `counts`, `displs`: Window length and start per rank.
    /// - `out`: The buffer receiving this rank's window.
    fn scatter_varcount<T: Payload>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
        root: usize,
    ) {
        let root_process = self.world.process_at_rank(root as i32);
        if self.rank == root {
            let partition = Partition::new(send, to_counts(counts), to_counts(displs));
            root_process.scatter_varcount_into_root(&partition, out);
        } else {
            root_process.scatter_varcount_into(out);
        }
    }

    /// Concatenates every rank's block on every rank (allgatherv).
    fn all_gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
    ) {
        let mut partition = PartitionMut::new(out, to_counts(counts), to_counts(displs));
        self.world.all_gather_varcount_into(local, &mut partition);
    }

    /// MPI counts and displacements are C `int`s.
    fn max_count(&self) -> usize {
        Count::MAX as usize
    }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }
}
