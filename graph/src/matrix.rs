use crate::registry::IdentityRegistry;
use crate::GraphError;
use lprec_core::model::{Interaction, NodeId, NodeKind};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

pub const MATRIX_MARKET_HEADER: &str = "%%MatrixMarket matrix coordinate real general";

/// Writes the solver inputs: the `N x N` coordinate matrix of interaction
/// weights and the `N x D` seed file that only declares the output shape.
pub struct MatrixSerializer;

impl MatrixSerializer {
    /// Returns the number of body lines written.
    pub async fn write_matrix(
        path: impl AsRef<Path>,
        registry: &IdentityRegistry,
        interactions: &[Interaction],
    ) -> Result<usize, GraphError> {
        // Resolve every endpoint before touching the file.
        let entries = resolve_entries(registry, interactions)?;
        let node_count = registry.node_count();

        let mut out = BufWriter::new(File::create(path.as_ref()).await?);
        out.write_all(format!("{}\n", MATRIX_MARKET_HEADER).as_bytes())
            .await?;
        out.write_all(format!("{} {} {}\n", node_count, node_count, entries.len()).as_bytes())
            .await?;
        for (user, product, weight) in &entries {
            out.write_all(format!("{} {} {}\n", user, product, weight).as_bytes())
                .await?;
        }
        out.flush().await?;

        debug!(
            "Wrote {} matrix entries to {}",
            entries.len(),
            path.as_ref().display()
        );
        Ok(entries.len())
    }

    pub async fn write_seed(
        path: impl AsRef<Path>,
        node_count: usize,
        product_count: usize,
    ) -> Result<(), GraphError> {
        let mut out = BufWriter::new(File::create(path.as_ref()).await?);
        out.write_all(format!("{}\n", MATRIX_MARKET_HEADER).as_bytes())
            .await?;
        out.write_all(format!("{} {} 0\n", node_count, product_count).as_bytes())
            .await?;
        out.flush().await?;
        Ok(())
    }
}

fn resolve_entries(
    registry: &IdentityRegistry,
    interactions: &[Interaction],
) -> Result<Vec<(NodeId, NodeId, u64)>, GraphError> {
    interactions
        .iter()
        .map(|interaction| {
            let user = registry.lookup(&interaction.user, NodeKind::User)?;
            let product = registry.lookup(&interaction.product, NodeKind::Product)?;
            Ok((user, product, interaction.weight))
        })
        .collect()
}
