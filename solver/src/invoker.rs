use lprec_core::config::SolverConfig;
use lprec_core::error::{ErrorCode, LprecError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("failed to launch solver {program}: {source}")]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("solver exited with status {}", describe_exit(.code))]
    NonZeroExit { code: Option<i32> },
    #[error("solver did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("seed file {actual} is not where the solver reads it ({expected})")]
    SeedsLocation { expected: PathBuf, actual: PathBuf },
    #[error("solver produced no results file at {0}")]
    MissingResults(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LprecError for SolverError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SolverError::Launch { .. } => ErrorCode::SolverFailure,
            SolverError::NonZeroExit { .. } => ErrorCode::SolverFailure,
            SolverError::TimedOut(_) => ErrorCode::SolverFailure,
            SolverError::SeedsLocation { .. } => ErrorCode::SolverFailure,
            SolverError::MissingResults(_) => ErrorCode::SolverFailure,
            SolverError::Io(_) => ErrorCode::Io,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverRequest {
    pub matrix: PathBuf,
    pub seeds: PathBuf,
    /// `D`: number of score columns per node.
    pub product_count: usize,
}

/// One blocking label-propagation run. On success returns the path of the
/// results file the solver deposited.
#[async_trait::async_trait]
pub trait LabelPropagationSolver: Send + Sync {
    async fn run(&self, request: &SolverRequest) -> Result<PathBuf, SolverError>;
}

/// Runs the GraphChi `label_propagation` toolkit as a child process.
pub struct ExternalSolver {
    program: PathBuf,
    timeout: Duration,
    results_suffix: String,
}

impl ExternalSolver {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            results_suffix: "_U.mm".to_string(),
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            program: PathBuf::from(&config.program),
            timeout: Duration::from_secs(config.timeout_secs),
            results_suffix: config.results_suffix.clone(),
        }
    }

    pub fn with_results_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.results_suffix = suffix.into();
        self
    }

    /// The toolkit takes no seeds argument; it opens `<training>.seeds`.
    pub fn seeds_path(matrix: &Path) -> PathBuf {
        let mut name: OsString = matrix.as_os_str().to_owned();
        name.push(".seeds");
        PathBuf::from(name)
    }

    pub fn results_path(&self, matrix: &Path) -> PathBuf {
        let mut name: OsString = matrix.as_os_str().to_owned();
        name.push(&self.results_suffix);
        PathBuf::from(name)
    }

    fn arguments(&self, request: &SolverRequest) -> Vec<OsString> {
        let mut training = OsString::from("--training=");
        training.push(request.matrix.as_os_str());
        vec![training, OsString::from(format!("--D={}", request.product_count))]
    }
}

#[async_trait::async_trait]
impl LabelPropagationSolver for ExternalSolver {
    async fn run(&self, request: &SolverRequest) -> Result<PathBuf, SolverError> {
        let expected_seeds = Self::seeds_path(&request.matrix);
        if request.seeds != expected_seeds {
            return Err(SolverError::SeedsLocation {
                expected: expected_seeds,
                actual: request.seeds.clone(),
            });
        }

        let results = self.results_path(&request.matrix);
        // A stale results file must never be mistaken for this run's output.
        match tokio::fs::remove_file(&results).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SolverError::Io(e)),
        }

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(self.arguments(request))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SolverError::Launch {
                program: self.program.clone(),
                source,
            })?;

        info!(
            "Solver started: {} (D={}, timeout {:?})",
            self.program.display(),
            request.product_count,
            self.timeout
        );

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                error!("Solver exceeded {:?}; terminating", self.timeout);
                child.kill().await?;
                return Err(SolverError::TimedOut(self.timeout));
            }
        };

        if !status.success() {
            error!("Solver failed with {}", status);
            return Err(SolverError::NonZeroExit {
                code: status.code(),
            });
        }
        if !tokio::fs::try_exists(&results).await? {
            return Err(SolverError::MissingResults(results));
        }

        info!(
            "Solver finished in {:.2}s, results at {}",
            started.elapsed().as_secs_f64(),
            results.display()
        );
        Ok(results)
    }
}
