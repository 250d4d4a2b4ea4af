use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lprec::{Pipeline, PipelineError};
use lprec_core::config::AppConfig;
use lprec_core::error::{ErrorCode, LprecError};
use solver::{LabelPropagationSolver, SolverError, SolverRequest};
use tempfile::tempdir;

const LOG: &str = "\
acme,u1,b,c,Desk Lamp
acme,u1,b,c,chair
acme,u2,b,c,chair
acme,u\\x,b,c,chair
acme,u1,b,c,Desk Lamp
acme,u2,b,c,rug
";
// ids: u1=0 Desk Lamp=1 chair=2 u2=3 rug=4; D=3

/// Writes `<matrix>_U.mm` in-process with rows produced by `row`.
struct StubSolver {
    calls: AtomicUsize,
    values: Box<dyn Fn(usize, usize) -> Vec<String> + Send + Sync>,
}

impl StubSolver {
    fn new(values: impl Fn(usize, usize) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            values: Box::new(values),
        }
    }
}

#[async_trait::async_trait]
impl LabelPropagationSolver for StubSolver {
    async fn run(&self, request: &SolverRequest) -> Result<PathBuf, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let matrix = tokio::fs::read_to_string(&request.matrix).await?;
        let nodes: usize = matrix
            .lines()
            .nth(1)
            .and_then(|l| l.split(' ').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        let mut body = String::from("%%MatrixMarket matrix array real general\n%%\n");
        body.push_str(&format!("{} {}\n", nodes, request.product_count));
        for value in (self.values)(nodes, request.product_count) {
            body.push_str(&value);
            body.push('\n');
        }

        let mut path = request.matrix.clone().into_os_string();
        path.push("_U.mm");
        let path = PathBuf::from(path);
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

struct FailingSolver;

#[async_trait::async_trait]
impl LabelPropagationSolver for FailingSolver {
    async fn run(&self, _request: &SolverRequest) -> Result<PathBuf, SolverError> {
        Err(SolverError::NonZeroExit { code: Some(1) })
    }
}

/// Node `n`, column `c` scores `c` for users except that u2 prefers column 0.
fn position_scores(nodes: usize, d: usize) -> Vec<String> {
    let mut out = Vec::new();
    for node in 0..nodes {
        for col in 0..d {
            let score = if node == 3 { (d - col) as f64 } else { col as f64 };
            out.push(format!("{}", score / 10.0));
        }
    }
    out
}

fn write_log(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("orders");
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_end_to_end_with_stub_solver() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let solver = Arc::new(StubSolver::new(position_scores));
    let pipeline = Pipeline::new(AppConfig::default(), solver.clone());

    let summary = pipeline.run(&input).await.unwrap();
    assert_eq!(summary.records_read, 6);
    assert_eq!(summary.skipped.sentinel, 1);
    assert_eq!((summary.users, summary.products, summary.interactions), (2, 3, 4));
    assert!(summary.solver_invoked);
    assert_eq!(summary.recommendations, 2);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);

    let matrix = std::fs::read_to_string(&summary.paths.matrix).unwrap();
    assert_eq!(matrix.lines().nth(1), Some("5 5 4"));
    assert!(matrix.lines().any(|l| l == "0 1 2"));
    let seeds = std::fs::read_to_string(&summary.paths.seeds).unwrap();
    assert_eq!(seeds.lines().nth(1), Some("5 3 0"));

    let final_result = std::fs::read_to_string(&summary.paths.final_result).unwrap();
    assert_eq!(
        final_result,
        "u1 : rug , chair , Desk Lamp , \nu2 : Desk Lamp , chair , rug , \n"
    );

    let rec_edges = std::fs::read_to_string(&summary.paths.recommendation_edges).unwrap();
    assert!(rec_edges.starts_with("Source;Target\n"));
    assert!(rec_edges.contains("u2;Desk-Lamp\n"));

    let nodes = std::fs::read_to_string(&summary.paths.nodes).unwrap();
    assert_eq!(nodes.lines().count(), 1 + 5);
    let edges = std::fs::read_to_string(&summary.paths.edges).unwrap();
    assert!(edges.contains("u1;Desk-Lamp;2\n"));
}

#[tokio::test]
async fn test_top_k_limits_each_line() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let mut config = AppConfig::default();
    config.output.top_k = 1;
    config.output.export_graph = false;
    let pipeline = Pipeline::new(config, Arc::new(StubSolver::new(position_scores)));

    let summary = pipeline.run(&input).await.unwrap();
    let final_result = std::fs::read_to_string(&summary.paths.final_result).unwrap();
    assert_eq!(final_result, "u1 : rug , \nu2 : Desk Lamp , \n");
    assert!(!summary.paths.nodes.exists());
    assert!(!summary.paths.recommendation_edges.exists());
}

#[tokio::test]
async fn test_solver_failure_writes_no_final_output() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(FailingSolver));

    let err = pipeline.run(&input).await.unwrap_err();
    assert!(matches!(err, PipelineError::Solver(_)));
    assert_eq!(err.error_code(), ErrorCode::SolverFailure);
    assert!(!dir.path().join("orders_final_result").exists());
    assert!(!dir.path().join("orders_edges_recommendation").exists());
}

#[tokio::test]
async fn test_solver_failure_preserves_existing_final_output() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let final_path = dir.path().join("orders_final_result");
    std::fs::write(&final_path, "earlier\n").unwrap();
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(FailingSolver));

    assert!(pipeline.run(&input).await.is_err());
    assert_eq!(std::fs::read_to_string(&final_path).unwrap(), "earlier\n");
}

#[tokio::test]
async fn test_short_results_stream_aborts_without_partial_output() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let solver = StubSolver::new(|nodes, d| {
        let mut values = position_scores(nodes, d);
        values.truncate(values.len() - 1);
        values
    });
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(solver));

    let err = pipeline.run(&input).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::MalformedResults);
    match err {
        PipelineError::Decode(decode::DecodeError::ShortStream { expected, observed }) => {
            assert_eq!((expected, observed), (15, 14));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("orders_final_result").exists());
    assert!(!dir.path().join("orders_final_result.partial").exists());
}

#[tokio::test]
async fn test_rows_wider_than_product_count_abort_without_output() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), LOG);
    let solver = StubSolver::new(|nodes, d| position_scores(nodes, d + 1));
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(solver));

    let err = pipeline.run(&input).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::MalformedResults);
    match err {
        PipelineError::Decode(decode::DecodeError::ExcessValues { expected, observed }) => {
            assert_eq!((expected, observed), (15, 20));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("orders_final_result").exists());
    assert!(!dir.path().join("orders_final_result.partial").exists());
    assert!(!dir.path().join("orders_edges_recommendation").exists());
}

#[tokio::test]
async fn test_no_products_completes_without_solver() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), "acme,u\\1,b,c,lamp\nbroken\n");
    let solver = Arc::new(StubSolver::new(position_scores));
    let pipeline = Pipeline::new(AppConfig::default(), solver.clone());

    let summary = pipeline.run(&input).await.unwrap();
    assert_eq!(summary.products, 0);
    assert_eq!(summary.recommendations, 0);
    assert_eq!(summary.skipped.total(), 2);
    assert!(!summary.solver_invoked);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 0);

    assert_eq!(std::fs::read_to_string(&summary.paths.final_result).unwrap(), "");
    let seeds = std::fs::read_to_string(&summary.paths.seeds).unwrap();
    assert_eq!(seeds.lines().nth(1), Some("0 0 0"));
}

#[tokio::test]
async fn test_missing_input_is_invalid_argument() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(FailingSolver));
    let err = pipeline.run(&dir.path().join("absent")).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn test_reformat_then_run_uses_cleaned_file() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("export.csv");
    std::fs::write(
        &raw,
        concat!(
            "1,d,\"acme\",x,\"u1\",y,z,\"b\",\"c\",\"lamp\"\n",
            "2,d,\"acme\",x,\"u1\",y,z,\"b\",\"c\",\"rug\"\n",
        ),
    )
    .unwrap();
    let pipeline = Pipeline::new(AppConfig::default(), Arc::new(StubSolver::new(position_scores)));

    let summary = pipeline.reformat_and_run(&raw).await.unwrap();
    assert_eq!(summary.paths.input, dir.path().join("clean_export.csv"));
    let final_result = std::fs::read_to_string(&summary.paths.final_result).unwrap();
    assert_eq!(final_result, "u1 : rug , lamp , \n");
}
