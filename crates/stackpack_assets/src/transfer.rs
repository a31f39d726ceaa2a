//! Filesystem moves and copies used when relocating artifacts.

use std::path::{Path, PathBuf};

use fs_extra::file::CopyOptions;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

async fn ensure_parent(path: &Path) -> AssetResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Copy `source` to `target`, overwriting any existing file.
pub async fn copy_file(source: &Path, target: &Path) -> AssetResult<()> {
    if !source.is_file() {
        return Err(AssetError::SourceNotFound(source.to_path_buf()));
    }
    ensure_parent(target).await?;
    tokio::fs::copy(source, target).await?;
    debug!("Copied {:?} -> {:?}", source, target);
    Ok(())
}

/// Move `source` to `target`. Falls back to copy-and-delete when a plain
/// rename is not possible (for example across filesystems).
pub async fn move_file(source: &Path, target: &Path) -> AssetResult<()> {
    if !source.is_file() {
        return Err(AssetError::SourceNotFound(source.to_path_buf()));
    }
    ensure_parent(target).await?;

    if tokio::fs::rename(source, target).await.is_ok() {
        debug!("Moved {:?} -> {:?}", source, target);
        return Ok(());
    }

    let (from, to) = (source.to_path_buf(), target.to_path_buf());
    tokio::task::spawn_blocking(move || {
        let options = CopyOptions::new().overwrite(true);
        fs_extra::file::move_file(&from, &to, &options)
    })
    .await??;
    debug!("Moved {:?} -> {:?} (copy fallback)", source, target);
    Ok(())
}

/// Remove everything inside `dir`, keeping the directory itself.
pub async fn clear_dir(dir: &Path) -> AssetResult<usize> {
    let mut entries: Vec<PathBuf> = Vec::new();
    let mut listing = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = listing.next_entry().await? {
        entries.push(entry.path());
    }

    let removed = entries.len();
    if removed > 0 {
        tokio::task::spawn_blocking(move || fs_extra::remove_items(&entries)).await??;
    }
    Ok(removed)
}
