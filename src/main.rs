use anyhow::Result;
use clap::{Parser, ValueEnum};
use gauss_jacobi::config::{DEFAULT_MAX_ITERS, EPSILON, InputForm, PartitionPolicy, SolverOptions};
use gauss_jacobi::context::{JacobiContext, SolveReport};
use gauss_jacobi::error::JError;
use gauss_jacobi::io::FileCoordinator;
use gauss_jacobi::parallel::UniverseComm;
use gauss_jacobi::utils::convergence::Termination;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Solve A·x = b with distributed Gauss-Jacobi iteration.
#[derive(Parser, Debug)]
#[command(name = "gauss-jacobi", version)]
struct Cli {
    /// Matrix A (CSR text: n nnz, offsets, columns, weights)
    matrix: PathBuf,

    /// Right-hand side b (text: n, values)
    rhs: PathBuf,

    /// Where to write the solution x
    output: PathBuf,

    /// Tolerance on ‖x_new − x‖₂ between two sweeps
    #[arg(long, default_value_t = EPSILON)]
    tol: f64,

    /// Give up after this many sweeps (0 = never)
    #[arg(long, default_value_t = DEFAULT_MAX_ITERS)]
    max_iters: usize,

    /// Report progress every this many sweeps (0 = never)
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// How rows are split when n is not a multiple of the rank count
    #[arg(long, value_enum, default_value_t = PartitionArg::Balanced)]
    partition: PartitionArg,

    /// Whether the files hold A and b, or the iteration matrix T and vector c
    #[arg(long, value_enum, default_value_t = FormArg::System)]
    form: FormArg,

    /// In-process ranks when not running under MPI (0 = one per CPU)
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PartitionArg {
    Balanced,
    Strict,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormArg {
    System,
    Iteration,
}

impl Cli {
    fn options(&self) -> SolverOptions {
        let max_iters = (self.max_iters > 0).then_some(self.max_iters);
        SolverOptions::new(self.tol, max_iters)
            .with_report_every(self.report_every)
            .with_partition(match self.partition {
                PartitionArg::Balanced => PartitionPolicy::Balanced,
                PartitionArg::Strict => PartitionPolicy::Strict,
            })
            .with_form(match self.form {
                FormArg::System => InputForm::System,
                FormArg::Iteration => InputForm::Iteration,
            })
    }

    fn coordinator(&self) -> FileCoordinator {
        FileCoordinator::new(&self.matrix, &self.rhs, &self.output)
    }
}

fn init_logging(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[cfg(all(feature = "rayon", not(feature = "mpi")))]
fn cpu_count() -> usize {
    num_cpus::get()
}

#[cfg(not(any(feature = "rayon", feature = "mpi")))]
fn cpu_count() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Run one MPI process; the rank is known only after initialization.
#[cfg(feature = "mpi")]
fn run(cli: &Cli) -> Result<(bool, Result<SolveReport, JError>)> {
    use gauss_jacobi::parallel::{Comm, MpiComm};
    let comm = MpiComm::init()?;
    let is_root = comm.is_root();
    if cli.ranks != 1 {
        tracing::debug!(ranks = cli.ranks, "--ranks is ignored under MPI");
    }
    let result = JacobiContext::new(UniverseComm::Mpi(comm), cli.coordinator(), cli.options()).run();
    Ok((is_root, result))
}

/// Run all ranks inside this process and keep the root's result.
#[cfg(not(feature = "mpi"))]
fn run(cli: &Cli) -> Result<(bool, Result<SolveReport, JError>)> {
    use gauss_jacobi::parallel::ThreadComm;
    let ranks = if cli.ranks == 0 { cpu_count() } else { cli.ranks };
    let options = cli.options();
    let mut results = if ranks == 1 {
        vec![JacobiContext::new(UniverseComm::Serial, cli.coordinator(), options).run()]
    } else {
        ThreadComm::run(ranks, |comm| {
            JacobiContext::new(UniverseComm::Threads(comm), cli.coordinator(), options.clone()).run()
        })
    };
    Ok((true, results.swap_remove(0)))
}

fn summarize(report: &SolveReport) -> ExitCode {
    let stats = &report.stats;
    match stats.reason {
        Termination::Converged => {
            tracing::info!(
                iterations = stats.iterations,
                error = stats.final_residual,
                residual = report.residual,
                ranks = report.ranks,
                "converged"
            );
        }
        reason => {
            tracing::warn!(
                ?reason,
                iterations = stats.iterations,
                error = stats.final_residual,
                "did not converge; last iterate written"
            );
        }
    }
    tracing::info!("Time elapsed: {:.6} seconds", report.elapsed.as_secs_f64());
    if stats.converged { ExitCode::SUCCESS } else { ExitCode::from(2) }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // help and version are not failures
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };
    if let Err(e) = init_logging(&cli.log_level) {
        println!("{e:#}");
        return ExitCode::from(1);
    }

    match run(&cli) {
        Ok((true, Ok(report))) => summarize(&report),
        Ok((false, Ok(report))) => {
            if report.stats.converged { ExitCode::SUCCESS } else { ExitCode::from(2) }
        }
        Ok((_, Err(JError::PeerFailure { rank }))) => {
            tracing::debug!(rank, "stopping after a failure on another rank");
            ExitCode::from(1)
        }
        Ok((_, Err(e))) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
