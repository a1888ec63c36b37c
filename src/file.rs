use std::fs;
use std::path::{Path, PathBuf};

use crate::model::payload::PhotoPayload;
use crate::store::is_jpeg_name;
use crate::sync_error::SyncResult;

pub fn list_files(path: &Path) -> SyncResult<Vec<PathBuf>> {
    let dir = fs::read_dir(path)?;
    let files = dir.map(|res| res.map(|e| e.path()));
    let mut paths = vec!();
    for file_buff in files {
        match file_buff {
            Ok(b) => paths.push(b),
            Err(e) => tracing::warn!(error = %e, "failed to read a path"),
        }
    }

    paths.sort();
    Ok(paths)
}

/// Reads the `.jpg`/`.jpeg` files among `paths` as inline payloads, in order.
pub async fn read_payloads(paths: Vec<PathBuf>) -> SyncResult<Vec<PhotoPayload>> {
    let mut payloads = Vec::new();

    for path in paths {
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !path.is_file() || !is_jpeg_name(filename) {
            tracing::info!(path = %path.display(), "not a jpeg, skipped");
            continue;
        }

        let content = tokio::fs::read(&path).await?;
        payloads.push(PhotoPayload::inline_jpeg(&content));
    }

    Ok(payloads)
}
