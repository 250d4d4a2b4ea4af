use crate::paths::PipelinePaths;
use config::ConfigError;
use decode::{recommend, DecodeError, RecommendationWriter, ResultStreamParser};
use graph::{
    FieldLayout, GraphError, GraphSnapshot, InteractionAggregator, MatrixSerializer, SkipStats,
};
use ingestion::IngestError;
use lprec_core::config::AppConfig;
use lprec_core::error::{ErrorCode, LprecError};
use lprec_core::model::{NodeKind, Recommendation};
use solver::{LabelPropagationSolver, SolverError, SolverRequest};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Output error: {0}")]
    Output(#[source] std::io::Error),
}

impl LprecError for PipelineError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::Config(_) => ErrorCode::InvalidArgument,
            PipelineError::Ingest(e) => e.error_code(),
            PipelineError::Graph(e) => e.error_code(),
            PipelineError::Solver(e) => e.error_code(),
            PipelineError::Decode(e) => e.error_code(),
            PipelineError::Output(_) => ErrorCode::Io,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub paths: PipelinePaths,
    pub records_read: u64,
    pub records_accepted: u64,
    pub skipped: SkipStats,
    pub users: usize,
    pub products: usize,
    pub interactions: usize,
    pub solver_invoked: bool,
    pub recommendations: usize,
}

/// Sequential batch run: aggregate, serialize, solve, decode, write.
/// Each stage finishes and closes its files before the next begins.
pub struct Pipeline {
    config: AppConfig,
    solver: Arc<dyn LabelPropagationSolver>,
}

impl Pipeline {
    pub fn new(config: AppConfig, solver: Arc<dyn LabelPropagationSolver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Cleans a raw export into `clean_<name>` and runs on the result.
    pub async fn reformat_and_run(&self, raw: &Path) -> Result<RunSummary, PipelineError> {
        let cleaned = ingestion::cleaned_path(raw);
        ingestion::reformat_export(raw, &cleaned, self.config.ingest.sentinel_char()?).await?;
        self.run(&cleaned).await
    }

    pub async fn run(&self, input: &Path) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let paths = PipelinePaths::derive(input, &self.config.output);

        let (graph, records_read) = self.build_graph(input).await?;
        info!(
            "Done aggregating: {} unique edges, {} users, {} products ({:.2}s)",
            graph.interactions.len(),
            graph.user_count(),
            graph.product_count(),
            started.elapsed().as_secs_f64()
        );

        self.write_solver_inputs(&graph, &paths).await?;
        info!(
            "Done formatting: D={} ({:.2}s)",
            graph.product_count(),
            started.elapsed().as_secs_f64()
        );

        let mut summary = RunSummary {
            paths: paths.clone(),
            records_read,
            records_accepted: graph.accepted,
            skipped: graph.skipped,
            users: graph.user_count(),
            products: graph.product_count(),
            interactions: graph.interactions.len(),
            solver_invoked: false,
            recommendations: 0,
        };

        if graph.product_count() == 0 || graph.user_count() == 0 {
            info!("Nothing to propagate; skipping solver");
            summary.recommendations = self.write_empty_recommendations(&graph, &paths).await?;
        } else {
            let request = SolverRequest {
                matrix: paths.matrix.clone(),
                seeds: paths.seeds.clone(),
                product_count: graph.product_count(),
            };
            let results = self.solver.run(&request).await?;
            summary.solver_invoked = true;
            info!(
                "Done propagating ({:.2}s)",
                started.elapsed().as_secs_f64()
            );

            summary.recommendations = self.decode_results(&graph, &results, &paths).await?;
        }

        if summary.skipped.total() > 0 {
            warn!(
                "Skipped {} malformed records ({} missing field, {} empty field, {} sentinel)",
                summary.skipped.total(),
                summary.skipped.missing_field,
                summary.skipped.empty_field,
                summary.skipped.sentinel
            );
        }
        info!(
            "Done: {} recommendations in {} ({:.2}s)",
            summary.recommendations,
            paths.final_result.display(),
            started.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    async fn build_graph(&self, input: &Path) -> Result<(GraphSnapshot, u64), PipelineError> {
        let ingest = &self.config.ingest;
        let mut aggregator = InteractionAggregator::new(FieldLayout {
            user_field: ingest.user_field,
            product_field: ingest.product_field,
            sentinel: ingest.sentinel_char()?,
        });
        let stats =
            ingestion::read_interaction_log(input, ingest.delimiter_char()?, &mut aggregator)
                .await?;
        Ok((aggregator.finalize(), stats.lines_read))
    }

    async fn write_solver_inputs(
        &self,
        graph: &GraphSnapshot,
        paths: &PipelinePaths,
    ) -> Result<(), PipelineError> {
        MatrixSerializer::write_matrix(&paths.matrix, &graph.registry, &graph.interactions)
            .await?;
        MatrixSerializer::write_seed(&paths.seeds, graph.node_count(), graph.product_count())
            .await?;

        if self.config.output.export_graph {
            decode::export_nodes(&paths.nodes, &graph.registry)
                .await
                .map_err(PipelineError::Output)?;
            decode::export_edges(&paths.edges, &graph.interactions)
                .await
                .map_err(PipelineError::Output)?;
        }
        Ok(())
    }

    async fn open_writer(
        &self,
        paths: &PipelinePaths,
    ) -> Result<RecommendationWriter, PipelineError> {
        let edges = self
            .config
            .output
            .export_graph
            .then_some(paths.recommendation_edges.as_path());
        RecommendationWriter::create(&paths.final_result, edges)
            .await
            .map_err(PipelineError::Output)
    }

    async fn write_empty_recommendations(
        &self,
        graph: &GraphSnapshot,
        paths: &PipelinePaths,
    ) -> Result<usize, PipelineError> {
        let mut writer = self.open_writer(paths).await?;
        for node in graph.registry.nodes() {
            if node.kind != NodeKind::User {
                continue;
            }
            if let Err(e) = writer.write(&Recommendation::empty(node.label.as_str())).await {
                writer.abort().await;
                return Err(PipelineError::Output(e));
            }
        }
        writer.commit().await.map_err(PipelineError::Output)
    }

    /// Returns the number of recommendations written.
    async fn decode_results(
        &self,
        graph: &GraphSnapshot,
        results: &Path,
        paths: &PipelinePaths,
    ) -> Result<usize, PipelineError> {
        let mut parser = ResultStreamParser::open(
            results,
            &graph.registry,
            graph.product_count(),
            self.config.solver.preamble_lines,
        )
        .await?;

        let mut writer = self.open_writer(paths).await?;
        if let Err(e) = self.stream_recommendations(graph, &mut parser, &mut writer).await {
            writer.abort().await;
            return Err(e);
        }

        let stats = match parser.finish().await {
            Ok(stats) => stats,
            Err(e) => {
                writer.abort().await;
                return Err(e.into());
            }
        };
        debug!(
            "Decoded {} values into {} user rows",
            stats.values_consumed, stats.user_vectors
        );
        writer.commit().await.map_err(PipelineError::Output)
    }

    async fn stream_recommendations<R>(
        &self,
        graph: &GraphSnapshot,
        parser: &mut ResultStreamParser<'_, R>,
        writer: &mut RecommendationWriter,
    ) -> Result<(), PipelineError>
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let top_k = self.config.output.top_k;
        while let Some(vector) = parser.next_vector().await? {
            let user = graph.registry.label_of(vector.node_id)?;
            let recommendation = recommend(user, &vector.scores, top_k, &graph.positions)?;
            writer
                .write(&recommendation)
                .await
                .map_err(PipelineError::Output)?;
        }
        Ok(())
    }
}
