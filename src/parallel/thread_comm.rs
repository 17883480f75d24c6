// In-process communicator: each rank is a thread, collectives meet at a barrier

use super::{Comm, Payload};
use std::any::Any;
use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};

type Slot = Option<Box<dyn Any + Send>>;

struct Shared {
    barrier: Barrier,
    slots: Mutex<Vec<Slot>>,
}

/// One rank of a group of threads that behave like message-passing processes.
///
/// Each collective posts the rank's contribution into its own slot, waits at
/// the group barrier, reads what it needs from the other slots, waits again
/// and then clears its slot. A rank never touches another rank's buffers
/// outside of a collective.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Create the communicators for a group of `size` ranks.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            barrier: Barrier::new(size.max(1)),
            slots: Mutex::new((0..size).map(|_| None).collect()),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, size, shared: Arc::clone(&shared) })
            .collect()
    }

    /// Run `f` once per rank on its own thread and collect the results in rank order.
    pub fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = Self::group(size);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.shared.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn post<T: Payload>(&self, data: Vec<T>) {
        self.slots()[self.rank] = Some(Box::new(data));
    }

    fn clear(&self) {
        self.slots()[self.rank] = None;
    }

    fn read<T: Payload, R>(&self, from: usize, f: impl FnOnce(&[T]) -> R) -> R {
        let slots = self.slots();
        let data = slots[from]
            .as_ref()
            .and_then(|b| b.downcast_ref::<Vec<T>>())
            .expect("ranks entered mismatched collectives");
        f(data)
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn broadcast<T: Payload>(&self, buf: &mut [T], root: usize) {
        if self.rank == root {
            self.post(buf.to_vec());
        }
        self.barrier();
        if self.rank != root {
            self.read(root, |data: &[T]| buf.copy_from_slice(data));
        }
        self.barrier();
        if self.rank == root {
            self.clear();
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
        if self.rank == root {
            self.post(send.to_vec());
        }
        self.barrier();
        let (start, count) = (displs[self.rank], counts[self.rank]);
        self.read(root, |data: &[T]| out.copy_from_slice(&data[start..start + count]));
        self.barrier();
        if self.rank == root {
            self.clear();
        }
    }

    fn all_gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: &[usize],
        displs: &[usize],
        out: &mut [T],
    ) {
        self.post(local.to_vec());
        self.barrier();
        for r in 0..self.size {
            let (start, count) = (displs[r], counts[r]);
            self.read(r, |data: &[T]| out[start..start + count].copy_from_slice(&data[..count]));
        }
        self.barrier();
        self.clear();
    }

    fn all_reduce(&self, x: f64) -> f64 {
        self.post(vec![x]);
        self.barrier();
        // rank order keeps the total bit-identical on every rank
        let total = (0..self.size).fold(0.0, |acc, r| acc + self.read(r, |data: &[f64]| data[0]));
        self.barrier();
        self.clear();
        total
    }
}
