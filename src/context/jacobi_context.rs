//! Driver for a complete distributed Jacobi run.
//!
//! This module provides the `JacobiContext` struct, which owns the communicator, the coordinator role
//! and the solver options for one rank, and takes that rank through the phases of a run:
//!
//! ```text
//! Loading → Distributing → { Sweeping ⇄ Converging } → GatheringFinal → Done
//! ```
//!
//! # Usage
//!
//! 1. Construct one `JacobiContext` per rank with the same options on every rank.
//! 2. Call `run` on every rank. Only the root rank reads input and writes output; every rank gets
//!    the gathered solution back in its report.
//!
//! Any failure on the root during loading, preparation or writing is broadcast, so all ranks
//! return an error from `run` together.

use crate::config::{InputForm, SolverOptions};
use crate::error::JError;
use crate::io::Coordinator;
use crate::matrix::LinearSystem;
use crate::parallel::{Comm, ROOT, agree};
use crate::partition::Partitioner;
use crate::solver::DistributedJacobi;
use crate::utils::convergence::SolveStats;
use std::time::{Duration, Instant};

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Distributing,
    Sweeping,
    GatheringFinal,
    Done,
}

/// What a rank knows at the end of a run.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Sweep statistics, identical on every rank
    pub stats: SolveStats<f64>,
    /// Final iterate, identical on every rank
    pub solution: Vec<f64>,
    /// Number of ranks that took part
    pub ranks: usize,
    /// ‖A·x − b‖₂ on the root when the input was a system; `None` elsewhere
    pub residual: Option<f64>,
    /// Wall time of the whole run on this rank
    pub elapsed: Duration,
}

/// Communicator, coordinator and options of one rank.
pub struct JacobiContext<C, K> {
    pub comm: C,
    pub coordinator: K,
    pub options: SolverOptions,
}

impl<C: Comm, K: Coordinator> JacobiContext<C, K> {
    pub fn new(comm: C, coordinator: K, options: SolverOptions) -> Self {
        Self { comm, coordinator, options }
    }

    fn enter(&self, phase: Phase) {
        tracing::debug!(rank = self.comm.rank(), ?phase, "entering phase");
    }

    /// Root only: turn the loaded system into the `x ← c + T·x` form the sweeps use.
    fn prepare(&self, loaded: &LinearSystem) -> Result<LinearSystem, JError> {
        match self.options.form {
            InputForm::System => {
                if !loaded.matrix.is_diagonally_dominant() {
                    tracing::warn!("matrix is not strictly diagonally dominant; Jacobi may not converge");
                }
                loaded.jacobi_iteration()
            }
            InputForm::Iteration => Ok(loaded.clone()),
        }
    }

    /// Collective. Run every phase on this rank.
    pub fn run(&mut self) -> Result<SolveReport, JError> {
        let started = Instant::now();
        tracing::debug!(
            rank = self.comm.rank(),
            size = self.comm.size(),
            pid = std::process::id(),
            "rank started"
        );

        self.enter(Phase::Loading);
        let loaded = self.coordinator.load(&self.comm)?;
        let prepared = match &loaded {
            Some(system) => self.prepare(system).map(Some),
            None => Ok(None),
        };
        let iteration = agree(&self.comm, prepared, ROOT)?;

        self.enter(Phase::Distributing);
        let sizes = self.coordinator.broadcast_sizes(&self.comm, iteration.as_ref());
        let (layout, block) = Partitioner::new(self.options.partition).distribute(
            &self.comm,
            sizes,
            iteration.as_ref(),
        )?;
        // the blocks are self-contained from here on
        drop(iteration);

        self.enter(Phase::Sweeping);
        let mut x = vec![0.0; sizes.n];
        let stats = DistributedJacobi::new(&self.comm, &layout, &block, &self.options).solve(&mut x);

        self.enter(Phase::GatheringFinal);
        self.coordinator.write_result(&self.comm, &x)?;

        let residual = match (loaded, self.options.form) {
            (Some(system), InputForm::System) => Some(system.residual_norm(&x)),
            _ => None,
        };
        self.enter(Phase::Done);
        Ok(SolveReport {
            stats,
            solution: x,
            ranks: self.comm.size(),
            residual,
            elapsed: started.elapsed(),
        })
    }
}
