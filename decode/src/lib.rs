pub mod output;
pub mod parser;
pub mod topk;

use graph::GraphError;
use lprec_core::error::{ErrorCode, LprecError};
use thiserror::Error;

pub use output::{export_edges, export_nodes, RecommendationWriter};
pub use parser::{ParseStats, ResultStreamParser, ScoreVector};
pub use topk::{recommend, select_top_k};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("results preamble truncated: expected {expected} header lines, found {observed}")]
    MissingPreamble { expected: usize, observed: usize },
    #[error("results stream ended early: expected {expected} values, found {observed}")]
    ShortStream { expected: usize, observed: usize },
    #[error("results stream too long: expected {expected} values, found {observed}")]
    ExcessValues { expected: usize, observed: usize },
    #[error("malformed value at line {line}: {value:?}")]
    MalformedValue { line: usize, value: String },
    #[error("score position {0} has no product")]
    UnknownPosition(usize),
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LprecError for DecodeError {
    fn error_code(&self) -> ErrorCode {
        match self {
            DecodeError::MissingPreamble { .. } => ErrorCode::MalformedResults,
            DecodeError::ShortStream { .. } => ErrorCode::MalformedResults,
            DecodeError::ExcessValues { .. } => ErrorCode::MalformedResults,
            DecodeError::MalformedValue { .. } => ErrorCode::MalformedResults,
            DecodeError::UnknownPosition(_) => ErrorCode::InvariantViolation,
            DecodeError::Graph(e) => e.error_code(),
            DecodeError::Io(_) => ErrorCode::Io,
        }
    }
}
