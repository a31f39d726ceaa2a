//! Asset manifest definitions.
//!
//! The manifest is the `<stack>.assets.json` document written next to the
//! synthesized template. It lists file assets (directories to archive or
//! files to ship as-is) and container images, each with one or more
//! publishing destinations. Entry order is kept exactly as written so that
//! "first destination" and "first image" mean the same thing on every run.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

/// Prefix of destination keys that target the deploying account.
pub const CURRENT_ACCOUNT_PREFIX: &str = "current_account-";

/// How a file asset was packaged by the build step.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    /// A directory that must be archived before upload.
    Zip,
    /// A single file uploaded as-is.
    #[default]
    File,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Packaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packaging::Zip => write!(f, "zip"),
            Packaging::File => write!(f, "file"),
            Packaging::Unknown => write!(f, "unknown"),
        }
    }
}

/// Publishing target for an asset.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub repository_name: Option<String>,
    #[serde(default)]
    pub image_tag: Option<String>,
    #[serde(default)]
    pub assume_role_arn: Option<String>,
}

/// Pick the destination to publish to: the first key addressing the
/// current account, otherwise the first key in document order.
pub fn select_destination(
    destinations: &IndexMap<String, Destination>,
) -> Option<(&str, &Destination)> {
    destinations
        .iter()
        .find(|(key, _)| key.starts_with(CURRENT_ACCOUNT_PREFIX))
        .or_else(|| destinations.first())
        .map(|(key, dest)| (key.as_str(), dest))
}

/// Source of a file asset, relative to the build output directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileSource {
    pub path: String,
    #[serde(default)]
    pub packaging: Packaging,
}

impl FileSource {
    /// Whether the source is a tarball.
    pub fn is_tarball(&self) -> bool {
        self.path.ends_with(".tar")
    }
}

/// A file asset entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    pub source: FileSource,
    #[serde(default)]
    pub destinations: IndexMap<String, Destination>,
}

impl FileAsset {
    pub fn destination(&self) -> Option<(&str, &Destination)> {
        select_destination(&self.destinations)
    }
}

/// Source of a container image asset.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerImageSource {
    /// Command that loads a pre-built image tarball, when the image was not
    /// built from a directory.
    #[serde(default)]
    pub executable: Option<Vec<String>>,
}

/// A container image asset entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DockerImageAsset {
    #[serde(default)]
    pub source: DockerImageSource,
    #[serde(default)]
    pub destinations: IndexMap<String, Destination>,
}

impl DockerImageAsset {
    pub fn destination(&self) -> Option<(&str, &Destination)> {
        select_destination(&self.destinations)
    }

    /// The load command as one shell line.
    pub fn load_command(&self) -> Option<String> {
        self.source.executable.as_ref().map(|args| args.join(" "))
    }
}

/// Parsed `<stack>.assets.json`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub files: IndexMap<String, FileAsset>,
    #[serde(default)]
    pub docker_images: IndexMap<String, DockerImageAsset>,
}

impl AssetManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(content: &str) -> AssetResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a manifest file.
    pub async fn load(path: &Path) -> AssetResult<Self> {
        debug!("Loading asset manifest from {:?}", path);
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::ManifestNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let manifest = Self::from_json(&content).map_err(|e| AssetError::InvalidManifest {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;
        debug!(
            "Manifest version {}: {} files, {} images",
            manifest.version.as_deref().unwrap_or("unknown"),
            manifest.files.len(),
            manifest.docker_images.len()
        );
        Ok(manifest)
    }
}
