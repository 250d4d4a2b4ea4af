pub mod aggregate;
pub mod matrix;
pub mod positions;
pub mod registry;

use lprec_core::error::{ErrorCode, LprecError};
use lprec_core::model::{NodeId, NodeKind};
use thiserror::Error;

pub use aggregate::{
    FieldLayout, GraphSnapshot, InteractionAggregator, RecordOutcome, SkipReason, SkipStats,
};
pub use matrix::{MatrixSerializer, MATRIX_MARKET_HEADER};
pub use positions::ProductPositionIndex;
pub use registry::IdentityRegistry;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("unknown node id: {0}")]
    UnknownId(NodeId),
    #[error("unknown {kind} label: {label}")]
    UnknownLabel { kind: NodeKind, label: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LprecError for GraphError {
    fn error_code(&self) -> ErrorCode {
        match self {
            GraphError::UnknownId(_) => ErrorCode::InvariantViolation,
            GraphError::UnknownLabel { .. } => ErrorCode::InvariantViolation,
            GraphError::Io(_) => ErrorCode::Io,
        }
    }
}
