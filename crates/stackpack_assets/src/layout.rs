//! Input and output directory conventions for one stack.
//!
//! Inputs come from the build output directory (`<stack>.template.json`,
//! `<stack>.assets.json`, asset sources). Outputs go to a templates
//! directory (one `<name>.json` per stack) and an assets directory holding
//! one folder per stack.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::AssetResult;
use crate::transfer;

/// Directory layout for a packaging run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    cdk_out: PathBuf,
    templates_dir: PathBuf,
    assets_dir: PathBuf,
    template_aliases: HashMap<String, String>,
    asset_folder_aliases: HashMap<String, String>,
}

impl OutputLayout {
    pub fn new(
        cdk_out: impl Into<PathBuf>,
        templates_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cdk_out: cdk_out.into(),
            templates_dir: templates_dir.into(),
            assets_dir: assets_dir.into(),
            template_aliases: HashMap::new(),
            asset_folder_aliases: HashMap::new(),
        }
    }

    /// Write the template of `stack` as `<stem>.json` instead of `<stack>.json`.
    pub fn with_template_alias(mut self, stack: impl Into<String>, stem: impl Into<String>) -> Self {
        self.template_aliases.insert(stack.into(), stem.into());
        self
    }

    pub fn with_template_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.template_aliases.extend(aliases);
        self
    }

    /// Store the assets of `stack` under `folder` instead of `<stack>`.
    pub fn with_asset_folder_alias(mut self, stack: impl Into<String>, folder: impl Into<String>) -> Self {
        self.asset_folder_aliases.insert(stack.into(), folder.into());
        self
    }

    pub fn with_asset_folder_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.asset_folder_aliases.extend(aliases);
        self
    }

    pub fn cdk_out(&self) -> &Path {
        &self.cdk_out
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn template_input(&self, stack: &str) -> PathBuf {
        self.cdk_out.join(format!("{}.template.json", stack))
    }

    pub fn manifest_input(&self, stack: &str) -> PathBuf {
        self.cdk_out.join(format!("{}.assets.json", stack))
    }

    pub fn template_output(&self, stack: &str) -> PathBuf {
        let stem = self
            .template_aliases
            .get(stack)
            .map(String::as_str)
            .unwrap_or(stack);
        self.templates_dir.join(format!("{}.json", stem))
    }

    /// Canonical asset folder for a stack.
    pub fn asset_dir(&self, stack: &str) -> PathBuf {
        let folder = self
            .asset_folder_aliases
            .get(stack)
            .map(String::as_str)
            .unwrap_or(stack);
        self.assets_dir.join(folder)
    }

    /// Folder earlier runs used, named after the raw stack id.
    pub fn legacy_asset_dir(&self, stack: &str) -> PathBuf {
        self.assets_dir.join(stack)
    }

    /// Get the per-stack asset folder ready for a fresh run.
    ///
    /// A legacy folder is renamed to the canonical name when only the
    /// legacy one exists. The canonical folder is then emptied, or created.
    pub async fn prepare_asset_dir(&self, stack: &str) -> AssetResult<PathBuf> {
        let canonical = self.asset_dir(stack);
        let legacy = self.legacy_asset_dir(stack);

        if legacy != canonical && legacy.exists() && !canonical.exists() {
            match tokio::fs::rename(&legacy, &canonical).await {
                Ok(()) => info!("Renamed legacy assets folder {:?} -> {:?}", legacy, canonical),
                Err(e) => warn!("Failed to rename legacy assets folder {:?}: {}", legacy, e),
            }
        }

        if canonical.exists() {
            let removed = transfer::clear_dir(&canonical).await?;
            info!("Cleared {} stale item(s) from {:?}", removed, canonical);
        } else {
            tokio::fs::create_dir_all(&canonical).await?;
        }

        Ok(canonical)
    }

    /// Make sure the templates directory exists.
    pub async fn prepare_templates_dir(&self) -> AssetResult<()> {
        tokio::fs::create_dir_all(&self.templates_dir).await?;
        Ok(())
    }

    /// Names of the artifacts currently in a stack's asset folder, sorted.
    pub fn list_artifacts(&self, stack: &str) -> Vec<String> {
        let dir = self.asset_dir(stack);
        let mut names: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&dir)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        names.sort();
        names
    }
}
