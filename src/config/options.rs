//! Solver options for the distributed Gauss-Jacobi engine.
//!
//! This module provides the `SolverOptions` struct, which collects the
//! stopping criteria, the progress reporting cadence, how rows are split
//! across ranks and how the input files are to be interpreted. The CLI
//! builds one of these from its arguments; library callers use the
//! `with_*` setters on top of `Default`.

/// Default tolerance on the global L2 error norm between two sweeps.
pub const EPSILON: f64 = 1e-10;

/// Default iteration bound.
pub const DEFAULT_MAX_ITERS: usize = 100_000;

/// How rows are assigned to ranks when `n` is not a multiple of the rank count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionPolicy {
    /// The first `n mod P` ranks receive one extra row.
    #[default]
    Balanced,
    /// Every rank receives exactly `n / P` rows; uneven sizes are rejected.
    Strict,
}

/// What the matrix and vector files hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputForm {
    /// `A` and `b` of the system `A·x = b`; split into iteration form on load.
    #[default]
    System,
    /// The iteration matrix `T` and vector `c` of `x ← c + T·x`, used as-is.
    Iteration,
}

/// Stopping criteria, reporting and decomposition parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Tolerance on the global error norm ‖x_new − x‖₂
    pub tol: f64,

    /// Upper bound on sweeps; `None` iterates until convergence
    pub max_iters: Option<usize>,

    /// Rank 0 reports progress every this many sweeps (0 disables)
    pub report_every: usize,

    /// Row-to-rank assignment
    pub partition: PartitionPolicy,

    /// Interpretation of the input files
    pub form: InputForm,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tol: EPSILON,
            max_iters: Some(DEFAULT_MAX_ITERS),
            report_every: 100,
            partition: PartitionPolicy::Balanced,
            form: InputForm::System,
        }
    }
}

impl SolverOptions {
    pub fn new(tol: f64, max_iters: Option<usize>) -> Self {
        Self { tol, max_iters, ..Self::default() }
    }

    pub fn with_report_every(mut self, every: usize) -> Self {
        self.report_every = every;
        self
    }

    pub fn with_partition(mut self, policy: PartitionPolicy) -> Self {
        self.partition = policy;
        self
    }

    pub fn with_form(mut self, form: InputForm) -> Self {
        self.form = form;
        self
    }
}
