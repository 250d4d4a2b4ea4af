use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lprec::{Pipeline, PipelineError, RunSummary};
use lprec_core::config::AppConfig;
use lprec_core::error::LprecError;
use lprec_core::{init_tracing, LogFormat};
use solver::ExternalSolver;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about = "Label-propagation product recommender")]
struct Cli {
    #[arg(help = "Interaction log (a raw export when --reformat is set)")]
    input: PathBuf,

    #[arg(long, help = "Configuration file layered over config/ and built-in defaults")]
    config: Option<PathBuf>,

    #[arg(long, help = "Clean a raw export into clean_<name> before running")]
    reformat: bool,

    #[arg(long, default_value = "human", help = "Log output: human or json")]
    log_format: LogFormat,
}

async fn run(cli: &Cli) -> Result<RunSummary, PipelineError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let solver = Arc::new(ExternalSolver::from_config(&config.solver));
    let pipeline = Pipeline::new(config, solver);

    if cli.reformat {
        pipeline.reformat_and_run(&cli.input).await
    } else {
        pipeline.run(&cli.input).await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli).await {
        Ok(summary) => {
            info!(
                "{} records read, {} accepted, {} skipped; {} users, {} products, {} edges",
                summary.records_read,
                summary.records_accepted,
                summary.skipped.total(),
                summary.users,
                summary.products,
                summary.interactions
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.error_code();
            error!("{} ({})", err, code);
            ExitCode::from(code.exit_code())
        }
    }
}
