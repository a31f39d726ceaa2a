//! Asset relocation.
//!
//! Walks the asset manifest and places one artifact per usable entry in the
//! stack's output folder:
//!
//! - `zip` entries are archived with the configured [`Archiver`] and moved
//!   into place under their destination object key
//! - `file` entries whose source is a `.tar` are copied under their object key
//! - container images loaded from a tarball are copied as `<imageTag>.tar`
//!
//! Failures are recorded per asset and never stop the remaining entries.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{error, info, warn};

use crate::archiver::Archiver;
use crate::error::AssetResult;
use crate::manifest::{AssetManifest, DockerImageAsset, FileAsset, Packaging};
use crate::transfer;

/// Classification of a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Archive,
    File,
    ContainerImage,
    Unsupported,
}

impl AssetKind {
    fn classify(packaging: Packaging) -> Self {
        match packaging {
            Packaging::Zip => AssetKind::Archive,
            Packaging::File => AssetKind::File,
            Packaging::Unknown => AssetKind::Unsupported,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Archive => write!(f, "archive"),
            AssetKind::File => write!(f, "file"),
            AssetKind::ContainerImage => write!(f, "container image"),
            AssetKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    Written { artifact: PathBuf },
    Skipped { reason: String },
    Failed { reason: String },
}

/// Per-asset entry in an [`AssetReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub asset_id: String,
    pub kind: AssetKind,
    pub outcome: AssetOutcome,
}

impl AssetRecord {
    fn new(asset_id: &str, kind: AssetKind, outcome: AssetOutcome) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            kind,
            outcome,
        }
    }

    fn skipped(asset_id: &str, kind: AssetKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Skipping {} asset {}: {}", kind, asset_id, reason);
        Self::new(asset_id, kind, AssetOutcome::Skipped { reason })
    }

    /// Name of the written artifact, if any.
    pub fn artifact_name(&self) -> Option<String> {
        match &self.outcome {
            AssetOutcome::Written { artifact } => artifact
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

/// Aggregated result of a relocation run.
#[derive(Debug, Clone, Default)]
pub struct AssetReport {
    records: Vec<AssetRecord>,
}

impl AssetReport {
    pub fn push(&mut self, record: AssetRecord) {
        self.records.push(record);
    }

    pub fn written(&self) -> Vec<&AssetRecord> {
        self.filter(|o| matches!(o, AssetOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> Vec<&AssetRecord> {
        self.filter(|o| matches!(o, AssetOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> Vec<&AssetRecord> {
        self.filter(|o| matches!(o, AssetOutcome::Failed { .. }))
    }

    /// True when no entry failed. Skipped entries do not count as failures.
    pub fn is_clean(&self) -> bool {
        self.failed().is_empty()
    }

    fn filter(&self, predicate: impl Fn(&AssetOutcome) -> bool) -> Vec<&AssetRecord> {
        self.records.iter().filter(|r| predicate(&r.outcome)).collect()
    }
}

/// Container image resolved from the manifest, consumed by template rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub asset_id: String,
    /// Content-hash tag the build step assigned to the image.
    pub image_tag: String,
    /// Artifact name in the asset folder, `<imageTag>.tar`.
    pub tarball_name: String,
    pub repository_name: Option<String>,
    /// Tarball produced by the build step.
    pub source_tarball: PathBuf,
}

/// Everything a relocation run produces.
#[derive(Debug, Clone, Default)]
pub struct Relocation {
    pub report: AssetReport,
    pub images: Vec<ImageAsset>,
}

/// Copies and repackages manifest entries into a stack's asset folder.
pub struct AssetRelocator {
    cdk_out: PathBuf,
    output_dir: PathBuf,
    archiver: Box<dyn Archiver>,
    tarball: Regex,
}

impl AssetRelocator {
    pub fn new(
        cdk_out: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        archiver: impl Archiver + 'static,
    ) -> Self {
        Self {
            cdk_out: cdk_out.into(),
            output_dir: output_dir.into(),
            archiver: Box::new(archiver),
            tarball: Regex::new(r"asset\.[a-f0-9]+\.tar").expect("tarball pattern is valid"),
        }
    }

    /// Process every entry of the manifest, in document order.
    pub async fn relocate(&self, manifest: &AssetManifest) -> Relocation {
        let mut relocation = Relocation::default();

        for (asset_id, asset) in manifest.files.iter() {
            let record = self.relocate_file(asset_id, asset).await;
            relocation.report.push(record);
        }

        for (asset_id, asset) in manifest.docker_images.iter() {
            match self.resolve_image(asset_id, asset) {
                Ok(image) => {
                    let outcome = self.finish(
                        asset_id,
                        AssetKind::ContainerImage,
                        self.copy_image(&image).await,
                    );
                    relocation
                        .report
                        .push(AssetRecord::new(asset_id, AssetKind::ContainerImage, outcome));
                    relocation.images.push(image);
                }
                Err(reason) => relocation.report.push(AssetRecord::skipped(
                    asset_id,
                    AssetKind::ContainerImage,
                    reason,
                )),
            }
        }

        info!(
            "Relocated assets: {} written, {} skipped, {} failed",
            relocation.report.written().len(),
            relocation.report.skipped().len(),
            relocation.report.failed().len()
        );

        relocation
    }

    async fn relocate_file(&self, asset_id: &str, asset: &FileAsset) -> AssetRecord {
        let kind = AssetKind::classify(asset.source.packaging);
        if kind == AssetKind::Unsupported {
            return AssetRecord::skipped(asset_id, kind, "packaging is not relocated");
        }
        if kind == AssetKind::File && !asset.source.is_tarball() {
            return AssetRecord::skipped(
                asset_id,
                kind,
                format!("{} is not a tarball", asset.source.path),
            );
        }

        let object_key = match asset.destination() {
            Some((_, dest)) => match &dest.object_key {
                Some(key) => key.clone(),
                None => return AssetRecord::skipped(asset_id, kind, "destination has no object key"),
            },
            None => return AssetRecord::skipped(asset_id, kind, "no destination found"),
        };

        let source = self.cdk_out.join(&asset.source.path);
        let target = self.output_dir.join(&object_key);

        let result = match kind {
            AssetKind::Archive => {
                info!("Archiving {:?} as {}", source, object_key);
                self.archive_into(&source, &object_key, &target).await
            }
            _ => {
                info!("Copying file asset {}", object_key);
                transfer::copy_file(&source, &target).await.map(|_| target)
            }
        };

        AssetRecord::new(asset_id, kind, self.finish(asset_id, kind, result))
    }

    async fn archive_into(&self, source: &Path, name: &str, target: &Path) -> AssetResult<PathBuf> {
        let archive = self.archiver.archive(source, name).await?;
        transfer::move_file(&archive, target).await?;
        Ok(target.to_path_buf())
    }

    fn resolve_image(&self, asset_id: &str, asset: &DockerImageAsset) -> Result<ImageAsset, String> {
        let command = asset
            .load_command()
            .ok_or_else(|| "no load command".to_string())?;
        let tarball = self
            .tarball_file_name(&command)
            .ok_or_else(|| "no tarball found in load command".to_string())?;
        let (_, dest) = asset
            .destination()
            .ok_or_else(|| "no destination found".to_string())?;
        let image_tag = dest
            .image_tag
            .clone()
            .ok_or_else(|| "destination has no image tag".to_string())?;

        Ok(ImageAsset {
            asset_id: asset_id.to_string(),
            tarball_name: format!("{}.tar", image_tag),
            image_tag,
            repository_name: dest.repository_name.clone(),
            source_tarball: self.cdk_out.join(tarball),
        })
    }

    /// `asset.<hash>.tar` named in an image load command.
    fn tarball_file_name(&self, command: &str) -> Option<String> {
        self.tarball.find(command).map(|m| m.as_str().to_string())
    }

    async fn copy_image(&self, image: &ImageAsset) -> AssetResult<PathBuf> {
        info!("Copying container image tarball as {}", image.tarball_name);
        let target = self.output_dir.join(&image.tarball_name);
        transfer::copy_file(&image.source_tarball, &target).await?;
        Ok(target)
    }

    fn finish(&self, asset_id: &str, kind: AssetKind, result: AssetResult<PathBuf>) -> AssetOutcome {
        match result {
            Ok(artifact) => AssetOutcome::Written { artifact },
            Err(e) => {
                error!("Failed to relocate {} asset {}: {}", kind, asset_id, e);
                AssetOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
