//! Archive creation through an external tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

/// Produces an archive from a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive the contents of `source_dir` into a file named `archive_name`
    /// and return where the archive was written.
    async fn archive(&self, source_dir: &Path, archive_name: &str) -> AssetResult<PathBuf>;
}

/// Archiver that shells out to a `zip`-compatible program.
///
/// The program runs inside the source directory as
/// `<program> -r -q <archive_name> ./` and leaves the archive there.
#[derive(Debug, Clone)]
pub struct ZipArchiver {
    program: String,
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new("zip")
    }
}

impl ZipArchiver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn build_args(&self, archive_name: &str) -> Vec<String> {
        vec![
            "-r".to_string(),
            "-q".to_string(),
            archive_name.to_string(),
            "./".to_string(),
        ]
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, source_dir: &Path, archive_name: &str) -> AssetResult<PathBuf> {
        if !source_dir.is_dir() {
            return Err(AssetError::SourceNotFound(source_dir.to_path_buf()));
        }

        // zip updates an existing archive in place; start from scratch instead
        let archive_path = source_dir.join(archive_name);
        if archive_path.exists() {
            tokio::fs::remove_file(&archive_path).await?;
        }

        let args = self.build_args(archive_name);
        debug!("Running: {} {} (in {:?})", self.program, args.join(" "), source_dir);

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(source_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AssetError::ArchiverUnavailable {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AssetError::ArchiveFailed {
                archive: archive_name.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(archive_path)
    }
}
