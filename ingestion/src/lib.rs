pub mod reader;
pub mod reformat;

use lprec_core::error::{ErrorCode, LprecError};
use std::path::PathBuf;
use thiserror::Error;

pub use reader::{read_interaction_log, LogStats};
pub use reformat::{cleaned_path, reformat_export, reformat_line, ReformatStats};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LprecError for IngestError {
    fn error_code(&self) -> ErrorCode {
        match self {
            IngestError::InputNotFound(_) => ErrorCode::InvalidArgument,
            IngestError::Io(_) => ErrorCode::Io,
        }
    }
}

pub(crate) async fn open_input(
    path: &std::path::Path,
) -> Result<tokio::fs::File, IngestError> {
    tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::InputNotFound(path.to_path_buf())
        } else {
            IngestError::Io(e)
        }
    })
}

/// Strips the line terminator and decodes lossily; upstream exports are not
/// guaranteed to be valid UTF-8.
pub(crate) fn decode_line(buf: &[u8]) -> std::borrow::Cow<'_, str> {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end])
}
