use crate::{decode_line, open_input, IngestError};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::info;

const CLIENT_FIELD: usize = 2;
const USER_FIELD: usize = 4;
const BRAND_FIELD: usize = 7;
const CATEGORY_FIELD: usize = 8;
const PRODUCT_FIELD: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReformatStats {
    pub lines_read: u64,
    pub written: u64,
    pub skipped: u64,
}

/// `clean_<name>` next to the raw export.
pub fn cleaned_path(raw: &Path) -> PathBuf {
    let name = raw
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    raw.with_file_name(format!("clean_{}", name))
}

/// Reduces one raw export line to `client,user,brand,category,product`.
pub fn reformat_line(line: &str, sentinel: char) -> Option<String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() <= PRODUCT_FIELD {
        return None;
    }
    if fields[CLIENT_FIELD].contains(sentinel) || fields[PRODUCT_FIELD].contains(sentinel) {
        return None;
    }

    let clean = |idx: usize| fields[idx].replace('"', "").trim().to_string();
    let kept = [
        clean(CLIENT_FIELD),
        clean(USER_FIELD),
        clean(BRAND_FIELD),
        clean(CATEGORY_FIELD),
        clean(PRODUCT_FIELD),
    ];
    if kept.iter().any(String::is_empty) {
        return None;
    }
    Some(kept.join(","))
}

pub async fn reformat_export(
    raw: impl AsRef<Path>,
    cleaned: impl AsRef<Path>,
    sentinel: char,
) -> Result<ReformatStats, IngestError> {
    let mut reader = BufReader::new(open_input(raw.as_ref()).await?);
    let mut out = BufWriter::new(File::create(cleaned.as_ref()).await?);
    let mut stats = ReformatStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines_read += 1;

        match reformat_line(&decode_line(&buf), sentinel) {
            Some(line) => {
                out.write_all(line.as_bytes()).await?;
                out.write_all(b"\n").await?;
                stats.written += 1;
            }
            None => stats.skipped += 1,
        }
    }
    out.flush().await?;

    info!(
        "Reformatted {} -> {} ({} kept, {} dropped)",
        raw.as_ref().display(),
        cleaned.as_ref().display(),
        stats.written,
        stats.skipped
    );
    Ok(stats)
}
