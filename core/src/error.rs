use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    Io,
    InvariantViolation,
    SolverFailure,
    MalformedResults,
}

impl ErrorCode {
    /// Process exit status reported by the CLI for this failure kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCode::InvalidArgument => 2,
            ErrorCode::SolverFailure => 3,
            ErrorCode::MalformedResults => 4,
            ErrorCode::InvariantViolation => 70,
            ErrorCode::Io => 74,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Io => "IO",
            ErrorCode::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorCode::SolverFailure => "SOLVER_FAILURE",
            ErrorCode::MalformedResults => "MALFORMED_RESULTS",
        };
        write!(f, "{}", s)
    }
}

pub trait LprecError: std::error::Error {
    fn error_code(&self) -> ErrorCode;
}
