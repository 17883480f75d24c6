//! Collective communication between the cooperating ranks.
//!
//! Every step of the engine that involves more than one rank goes through
//! the [`Comm`] trait. All operations are collective: each rank of the group
//! must call the same operation in the same order, and no rank returns from
//! it before all ranks have entered it.

use crate::error::JError;

/// Rank that performs all sequential I/O.
pub const ROOT: usize = 0;

/// Element types that can travel through a collective.
#[cfg(feature = "mpi")]
pub trait Payload: Copy + Send + Sync + 'static + mpi::datatype::Equivalence {}
#[cfg(feature = "mpi")]
impl<T: Copy + Send + Sync + 'static + mpi::datatype::Equivalence> Payload for T {}

/// Element types that can travel through a collective.
#[cfg(not(feature = "mpi"))]
pub trait Payload: Copy + Send + Sync + 'static {}
#[cfg(not(feature = "mpi"))]
impl<T: Copy + Send + Sync + 'static> Payload for T {}

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Copy `buf` on `root` into `buf` on every other rank.
    fn broadcast<T: Payload>(&self, buf: &mut [T], root: usize);
    /// Rank `r` receives `send[displs[r]..displs[r] + counts[r]]` into `out`.
    /// `send` is only read on `root`; windows may overlap.
    fn scatter_varcount<T: Payload>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
        root: usize,
    );
    /// Every rank's `local` lands at `out[displs[r]..displs[r] + counts[r]]` on all ranks.
    fn all_gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
    );
    /// Sum of `x` over all ranks, identical on every rank.
    fn all_reduce(&self, x: f64) -> f64;

    /// Largest element count or displacement one collective can address.
    fn max_count(&self) -> usize {
        usize::MAX
    }

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }
}

/// Make every rank agree on the outcome of a step that only `root` ran.
///
/// The root broadcasts a status byte; on failure the root keeps its own
/// error and every other rank gets [`JError::PeerFailure`]. Non-root ranks
/// pass `Ok` with a placeholder value.
pub fn agree<C: Comm, T>(comm: &C, local: Result<T, JError>, root: usize) -> Result<T, JError> {
    let mut status = [match &local {
        Ok(_) => 0u8,
        Err(e) => e.status_code(),
    }];
    comm.broadcast(&mut status, root);
    match local {
        Err(e) if comm.rank() == root => Err(e),
        _ if status[0] != 0 => Err(JError::PeerFailure { rank: root }),
        other => other,
    }
}

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

pub mod thread_comm;
pub use thread_comm::ThreadComm;

pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    Threads(ThreadComm),
    Serial,
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Threads(comm) => comm.rank(),
            UniverseComm::Serial => 0,
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Threads(comm) => comm.size(),
            UniverseComm::Serial => 1,
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Threads(comm) => comm.barrier(),
            UniverseComm::Serial => {}
        }
    }
    fn broadcast<T: Payload>(&self, buf: &mut [T], root: usize) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.broadcast(buf, root),
            UniverseComm::Threads(comm) => comm.broadcast(buf, root),
            UniverseComm::Serial => {}
        }
    }
    fn scatter_varcount<T: Payload>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
        root: usize,
    ) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.scatter_varcount(send, counts, displs, out, root),
            UniverseComm::Threads(comm) => comm.scatter_varcount(send, counts, displs, out, root),
            UniverseComm::Serial => out.copy_from_slice(&send[displs[0]..displs[0] + counts[0]]),
        }
    }
    fn all_gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
    ) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_varcount(local, counts, displs, out),
            UniverseComm::Threads(comm) => comm.all_gather_varcount(local, counts, displs, out),
            UniverseComm::Serial => out[displs[0]..displs[0] + counts[0]].copy_from_slice(local),
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce(x),
            UniverseComm::Threads(comm) => comm.all_reduce(x),
            UniverseComm::Serial => x,
        }
    }
    fn max_count(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.max_count(),
            UniverseComm::Threads(comm) => comm.max_count(),
            UniverseComm::Serial => usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_collectives_are_local_copies() {
        let comm = UniverseComm::Serial;
        let mut buf = [7usize, 8];
        comm.broadcast(&mut buf, ROOT);
        assert_eq!(buf, [7, 8]);

        let mut out = [0.0; 2];
        comm.scatter_varcount(&[1.0, 2.0, 3.0], &[2], &[1], &mut out, ROOT);
        assert_eq!(out, [2.0, 3.0]);

        let mut x = [0.0; 3];
        comm.all_gather_varcount(&[4.0, 5.0, 6.0], &[3], &[0], &mut x);
        assert_eq!(x, [4.0, 5.0, 6.0]);
        assert_eq!(comm.all_reduce(2.5), 2.5);
        assert!(comm.is_root());
    }

    #[test]
    fn agree_spreads_root_failure() {
        let results = ThreadComm::run(3, |comm| {
            let local: Result<u32, JError> = if comm.is_root() {
                Err(JError::Partition("nope".into()))
            } else {
                Ok(0)
            };
            agree(&comm, local, ROOT)
        });
        assert!(matches!(results[0], Err(JError::Partition(_))));
        assert!(matches!(results[1], Err(JError::PeerFailure { rank: 0 })));
        assert!(matches!(results[2], Err(JError::PeerFailure { rank: 0 })));
    }

    #[test]
    fn agree_passes_success_through() {
        let results = ThreadComm::run(2, |comm| agree(&comm, Ok(comm.rank()), ROOT));
        assert_eq!(results[0].as_ref().ok(), Some(&0));
        assert_eq!(results[1].as_ref().ok(), Some(&1));
    }
}
