use graph::IdentityRegistry;
use lprec_core::model::{Interaction, NodeKind, Recommendation};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

/// Graph-visualization tools split on spaces in ids.
fn export_label(label: &str) -> String {
    label.replace(' ', "-")
}

/// A file written under a `.partial` sibling name and renamed into place on
/// commit, so readers never observe a half-written result.
struct StagedFile {
    path: PathBuf,
    tmp: PathBuf,
    out: BufWriter<File>,
}

impl StagedFile {
    async fn create(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!("{}.partial", name));
        let out = BufWriter::new(File::create(&tmp).await?);
        Ok(Self {
            path: path.to_path_buf(),
            tmp,
            out,
        })
    }

    async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await
    }

    async fn commit(mut self) -> std::io::Result<PathBuf> {
        self.out.flush().await?;
        drop(self.out);
        fs::rename(&self.tmp, &self.path).await?;
        Ok(self.path)
    }

    async fn discard(self) {
        drop(self.out);
        if let Err(e) = fs::remove_file(&self.tmp).await {
            warn!("Failed to remove {}: {}", self.tmp.display(), e);
        }
    }
}

/// Streams recommendations to the final results file and, optionally, the
/// recommendation edge list. Nothing is visible at the target paths until
/// `commit`.
pub struct RecommendationWriter {
    results: StagedFile,
    edges: Option<StagedFile>,
    written: usize,
}

impl RecommendationWriter {
    pub async fn create(
        final_result: impl AsRef<Path>,
        recommendation_edges: Option<&Path>,
    ) -> std::io::Result<Self> {
        let results = StagedFile::create(final_result.as_ref()).await?;
        let edges = match recommendation_edges {
            Some(path) => {
                let mut staged = StagedFile::create(path).await?;
                staged.write("Source;Target\n").await?;
                Some(staged)
            }
            None => None,
        };
        Ok(Self {
            results,
            edges,
            written: 0,
        })
    }

    /// `"<user> : <p1> , <p2> , "` followed by a newline.
    pub fn format_line(recommendation: &Recommendation) -> String {
        let mut line = format!("{} : ", recommendation.user);
        for product in &recommendation.products {
            line.push_str(&product.label);
            line.push_str(" , ");
        }
        line.push('\n');
        line
    }

    pub async fn write(&mut self, recommendation: &Recommendation) -> std::io::Result<()> {
        self.results
            .write(&Self::format_line(recommendation))
            .await?;
        if let Some(edges) = self.edges.as_mut() {
            for product in &recommendation.products {
                edges
                    .write(&format!(
                        "{};{}\n",
                        recommendation.user,
                        export_label(&product.label)
                    ))
                    .await?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Publishes the edge list first so the final results never appear
    /// without it.
    pub async fn commit(self) -> std::io::Result<usize> {
        if let Some(edges) = self.edges {
            if let Err(e) = edges.commit().await {
                self.results.discard().await;
                return Err(e);
            }
        }
        let path = self.results.commit().await?;
        info!("Wrote {} recommendations to {}", self.written, path.display());
        Ok(self.written)
    }

    pub async fn abort(self) {
        self.results.discard().await;
        if let Some(edges) = self.edges {
            edges.discard().await;
        }
    }
}

/// `Id;Label` node list in discovery order.
pub async fn export_nodes(
    path: impl AsRef<Path>,
    registry: &IdentityRegistry,
) -> std::io::Result<usize> {
    let mut out = BufWriter::new(File::create(path.as_ref()).await?);
    out.write_all(b"Id;Label\n").await?;
    for node in registry.nodes() {
        let label = match node.kind {
            NodeKind::User => node.label.clone(),
            NodeKind::Product => export_label(&node.label),
        };
        out.write_all(format!("{};{}\n", label, label).as_bytes())
            .await?;
    }
    out.flush().await?;
    Ok(registry.node_count())
}

/// `Source;Target;Weight` edge list, one row per interaction.
pub async fn export_edges(
    path: impl AsRef<Path>,
    interactions: &[Interaction],
) -> std::io::Result<usize> {
    let mut out = BufWriter::new(File::create(path.as_ref()).await?);
    out.write_all(b"Source;Target;Weight\n").await?;
    for interaction in interactions {
        out.write_all(
            format!(
                "{};{};{}\n",
                interaction.user,
                export_label(&interaction.product),
                interaction.weight
            )
            .as_bytes(),
        )
        .await?;
    }
    out.flush().await?;
    Ok(interactions.len())
}
