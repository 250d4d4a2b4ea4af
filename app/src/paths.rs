use lprec_core::config::OutputConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Every file a run touches, derived from the input log path by fixed suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub input: PathBuf,
    pub matrix: PathBuf,
    pub seeds: PathBuf,
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub final_result: PathBuf,
    pub recommendation_edges: PathBuf,
}

impl PipelinePaths {
    pub fn derive(input: &Path, output: &OutputConfig) -> Self {
        Self {
            input: input.to_path_buf(),
            matrix: with_suffix(input, "_temp"),
            seeds: with_suffix(input, "_temp.seeds"),
            nodes: with_suffix(input, "_nodes.csv"),
            edges: with_suffix(input, "_edges.csv"),
            final_result: with_suffix(input, &output.final_result_suffix),
            recommendation_edges: with_suffix(input, "_edges_recommendation"),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
