use crate::DecodeError;
use graph::IdentityRegistry;
use lprec_core::model::{NodeId, NodeKind};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    pub node_id: NodeId,
    /// One score per product position.
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub values_consumed: usize,
    pub user_vectors: usize,
}

/// Decodes the solver's flattened `node_count x D` value stream, which
/// carries no node markers, into one score vector per user node.
///
/// Rows are attributed purely by position: row `i` belongs to dense id `i`.
/// The cursor only moves forward and never looks past the value it just
/// consumed. A row boundary is detected right after the value completing it,
/// so the next value always starts the next node's row. Product rows are
/// consumed and dropped.
pub struct ResultStreamParser<'g, R> {
    reader: R,
    registry: &'g IdentityRegistry,
    row_width: usize,
    node_count: usize,
    current_node: NodeId,
    values_in_row: usize,
    pending: Vec<f64>,
    line_no: usize,
    line: String,
    stats: ParseStats,
}

impl<'g> ResultStreamParser<'g, BufReader<File>> {
    /// Opens a results file and skips its `preamble_lines` header lines.
    pub async fn open(
        path: impl AsRef<Path>,
        registry: &'g IdentityRegistry,
        row_width: usize,
        preamble_lines: usize,
    ) -> Result<Self, DecodeError> {
        let file = File::open(path.as_ref()).await?;
        let mut parser = Self::new(BufReader::new(file), registry, row_width);
        parser.skip_preamble(preamble_lines).await?;
        Ok(parser)
    }
}

impl<'g, R: AsyncBufRead + Unpin> ResultStreamParser<'g, R> {
    pub fn new(reader: R, registry: &'g IdentityRegistry, row_width: usize) -> Self {
        Self {
            reader,
            registry,
            row_width,
            node_count: registry.node_count(),
            current_node: 0,
            values_in_row: 0,
            pending: Vec::with_capacity(row_width),
            line_no: 0,
            line: String::new(),
            stats: ParseStats::default(),
        }
    }

    pub async fn skip_preamble(&mut self, lines: usize) -> Result<(), DecodeError> {
        for observed in 0..lines {
            if !self.read_line().await? {
                return Err(DecodeError::MissingPreamble {
                    expected: lines,
                    observed,
                });
            }
        }
        Ok(())
    }

    pub fn expected_values(&self) -> usize {
        self.node_count * self.row_width
    }

    /// Next user's complete score vector, or `None` once every node's row
    /// has been consumed.
    pub async fn next_vector(&mut self) -> Result<Option<ScoreVector>, DecodeError> {
        loop {
            if self.current_node >= self.node_count {
                return Ok(None);
            }
            let kind = self.registry.kind_of(self.current_node)?;

            if self.row_width == 0 {
                let node_id = self.advance_row();
                if kind == NodeKind::User {
                    return Ok(Some(self.emit(node_id)));
                }
                continue;
            }

            let value = self.read_value().await?;
            if kind == NodeKind::User {
                self.pending.push(value);
            }
            self.values_in_row += 1;

            if self.values_in_row == self.row_width {
                let node_id = self.advance_row();
                if kind == NodeKind::User {
                    return Ok(Some(self.emit(node_id)));
                }
            }
        }
    }

    /// Checks that nothing but blank lines follows the expected values.
    /// Only valid once `next_vector` has returned `None`.
    pub async fn finish(mut self) -> Result<ParseStats, DecodeError> {
        let mut excess = 0;
        while self.read_line().await? {
            if !self.line.trim().is_empty() {
                excess += 1;
            }
        }
        if excess > 0 {
            return Err(DecodeError::ExcessValues {
                expected: self.expected_values(),
                observed: self.stats.values_consumed + excess,
            });
        }
        Ok(self.stats)
    }

    fn advance_row(&mut self) -> NodeId {
        let finished = self.current_node;
        self.current_node += 1;
        self.values_in_row = 0;
        finished
    }

    fn emit(&mut self, node_id: NodeId) -> ScoreVector {
        self.stats.user_vectors += 1;
        debug!("Decoded score row for node {}", node_id);
        ScoreVector {
            node_id,
            scores: std::mem::replace(&mut self.pending, Vec::with_capacity(self.row_width)),
        }
    }

    async fn read_value(&mut self) -> Result<f64, DecodeError> {
        if !self.read_line().await? {
            return Err(DecodeError::ShortStream {
                expected: self.expected_values(),
                observed: self.stats.values_consumed,
            });
        }

        let raw = self.line.trim();
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DecodeError::MalformedValue {
                line: self.line_no,
                value: raw.to_string(),
            })?;
        self.stats.values_consumed += 1;
        Ok(value)
    }

    async fn read_line(&mut self) -> Result<bool, DecodeError> {
        self.line.clear();
        let read = self.reader.read_line(&mut self.line).await?;
        if read == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        Ok(true)
    }
}
