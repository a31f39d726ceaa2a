//! Integration tests for asset relocation.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stackpack_assets::{
    AssetKind, AssetManifest, AssetRelocator, AssetResult, Archiver, OutputLayout,
};
use tempfile::tempdir;

/// Archiver that writes a marker file instead of running `zip`.
struct StubArchiver;

#[async_trait]
impl Archiver for StubArchiver {
    async fn archive(&self, source_dir: &Path, archive_name: &str) -> AssetResult<PathBuf> {
        let path = source_dir.join(archive_name);
        tokio::fs::write(&path, format!("archive of {}", source_dir.display())).await?;
        Ok(path)
    }
}

const IMAGE_TAG: &str = "5d1e0c3f2a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4c3d";

fn write_fixture(cdk_out: &Path) {
    fs::create_dir_all(cdk_out.join("asset.fn1")).unwrap();
    fs::write(cdk_out.join("asset.fn1/index.js"), "exports.handler = 1;").unwrap();
    fs::write(cdk_out.join("nested.template.json"), "{}").unwrap();
    fs::write(cdk_out.join("asset.dead.tar"), "image bytes").unwrap();

    let manifest = format!(
        r#"{{
  "version": "36.0.0",
  "files": {{
    "fn1": {{
      "source": {{ "path": "asset.fn1", "packaging": "zip" }},
      "destinations": {{
        "current_account-current_region": {{ "bucketName": "cdk-assets", "objectKey": "fn1.zip" }}
      }}
    }},
    "nested": {{
      "source": {{ "path": "nested.template.json", "packaging": "file" }},
      "destinations": {{
        "current_account-current_region": {{ "bucketName": "cdk-assets", "objectKey": "nested.json" }}
      }}
    }}
  }},
  "dockerImages": {{
    "img": {{
      "source": {{ "executable": ["sh", "-c", "docker load -i asset.dead.tar | tail -1"] }},
      "destinations": {{
        "current_account-current_region": {{ "repositoryName": "cdk-images", "imageTag": "{tag}" }}
      }}
    }}
  }}
}}"#,
        tag = IMAGE_TAG
    );
    fs::write(cdk_out.join("ApiStack.assets.json"), manifest).unwrap();
}

#[tokio::test]
async fn test_classification_writes_two_artifacts() {
    let temp = tempdir().unwrap();
    let cdk_out = temp.path().join("cdk.out");
    write_fixture(&cdk_out);

    let layout = OutputLayout::new(&cdk_out, temp.path().join("cfn"), temp.path().join("assets"));
    let manifest = AssetManifest::load(&layout.manifest_input("ApiStack")).await.unwrap();
    let output_dir = layout.prepare_asset_dir("ApiStack").await.unwrap();

    let relocator = AssetRelocator::new(layout.cdk_out(), output_dir, StubArchiver);
    let relocation = relocator.relocate(&manifest).await;

    assert!(relocation.report.is_clean());
    assert_eq!(relocation.report.written().len(), 2);
    assert_eq!(relocation.report.skipped().len(), 1);
    assert_eq!(
        layout.list_artifacts("ApiStack"),
        vec![format!("{}.tar", IMAGE_TAG), "fn1.zip".to_string()]
    );

    assert_eq!(relocation.images.len(), 1);
    let image = &relocation.images[0];
    assert_eq!(image.image_tag, IMAGE_TAG);
    assert_eq!(image.tarball_name, format!("{}.tar", IMAGE_TAG));
    assert_eq!(image.repository_name.as_deref(), Some("cdk-images"));
}

#[tokio::test]
async fn test_second_run_yields_same_artifacts() {
    let temp = tempdir().unwrap();
    let cdk_out = temp.path().join("cdk.out");
    write_fixture(&cdk_out);

    let layout = OutputLayout::new(&cdk_out, temp.path().join("cfn"), temp.path().join("assets"));
    let manifest = AssetManifest::load(&layout.manifest_input("ApiStack")).await.unwrap();

    let mut listings = Vec::new();
    for _ in 0..2 {
        let output_dir = layout.prepare_asset_dir("ApiStack").await.unwrap();
        AssetRelocator::new(layout.cdk_out(), &output_dir, StubArchiver)
            .relocate(&manifest)
            .await;
        listings.push(layout.list_artifacts("ApiStack"));
        fs::write(output_dir.join("leftover.zip"), "stale").unwrap();
    }

    assert_eq!(listings[0], listings[1]);
    assert!(!listings[1].contains(&"leftover.zip".to_string()));
}

#[tokio::test]
async fn test_missing_sources_do_not_stop_other_assets() {
    let temp = tempdir().unwrap();
    let cdk_out = temp.path().join("cdk.out");
    write_fixture(&cdk_out);
    fs::remove_file(cdk_out.join("asset.dead.tar")).unwrap();

    let layout = OutputLayout::new(&cdk_out, temp.path().join("cfn"), temp.path().join("assets"));
    let manifest = AssetManifest::load(&layout.manifest_input("ApiStack")).await.unwrap();
    let output_dir = layout.prepare_asset_dir("ApiStack").await.unwrap();

    let relocation = AssetRelocator::new(layout.cdk_out(), output_dir, StubArchiver)
        .relocate(&manifest)
        .await;

    let failed = relocation.report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, AssetKind::ContainerImage);
    assert_eq!(layout.list_artifacts("ApiStack"), vec!["fn1.zip".to_string()]);
    // the image is still known to template rewriting
    assert_eq!(relocation.images.len(), 1);
}

#[tokio::test]
async fn test_missing_manifest_is_an_error() {
    let temp = tempdir().unwrap();
    let err = AssetManifest::load(&temp.path().join("nope.assets.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, stackpack_assets::AssetError::ManifestNotFound(_)));
}

#[tokio::test]
async fn test_unparsable_manifest_is_an_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.assets.json");
    fs::write(&path, "not json").unwrap();

    let err = AssetManifest::load(&path).await.unwrap_err();
    assert!(matches!(err, stackpack_assets::AssetError::InvalidManifest { .. }));
}
