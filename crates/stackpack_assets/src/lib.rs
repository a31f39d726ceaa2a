//! # stackpack_assets
//!
//! Asset manifest parsing and artifact relocation for stackpack.
//!
//! This crate reads the asset manifest emitted next to a synthesized
//! template and turns its entries into a flat folder of redistributable
//! artifacts:
//!
//! - Directory assets archived with an external `zip` tool
//! - Tarball file assets copied as-is
//! - Container image tarballs copied as `<imageTag>.tar`
//!
//! ## Example
//!
//! ```rust,no_run
//! use stackpack_assets::{AssetManifest, AssetRelocator, OutputLayout, ZipArchiver};
//!
//! # async fn run() -> stackpack_assets::AssetResult<()> {
//! let layout = OutputLayout::new("cdk.out", "dist/cfn", "dist/assets");
//! let manifest = AssetManifest::load(&layout.manifest_input("ApiStack")).await?;
//! let output_dir = layout.prepare_asset_dir("ApiStack").await?;
//!
//! let relocator = AssetRelocator::new(layout.cdk_out(), output_dir, ZipArchiver::default());
//! let relocation = relocator.relocate(&manifest).await;
//! assert!(relocation.report.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod archiver;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod relocator;
pub mod transfer;

pub use archiver::{Archiver, ZipArchiver};
pub use error::{AssetError, AssetResult};
pub use layout::OutputLayout;
pub use manifest::{
    select_destination, AssetManifest, Destination, DockerImageAsset, DockerImageSource,
    FileAsset, FileSource, Packaging,
};
pub use relocator::{
    AssetKind, AssetOutcome, AssetRecord, AssetRelocator, AssetReport, ImageAsset, Relocation,
};
