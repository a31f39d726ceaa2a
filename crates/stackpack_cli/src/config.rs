//! Layered run configuration: defaults, then `stackpack.yaml`, then flags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stackpack_assets::OutputLayout;
use stackpack_template::PipelineOptions;
use thiserror::Error;
use tracing::debug;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stackpack.yaml";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings for packaging one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Build output directory holding templates, manifests and asset sources.
    pub cdk_out: PathBuf,
    /// Where rewritten templates are written.
    pub templates_dir: PathBuf,
    /// Parent of the per-stack asset folders.
    pub assets_dir: PathBuf,
    /// Program used to build zip archives.
    pub archiver: String,
    /// Stack name to template file stem.
    pub template_aliases: HashMap<String, String>,
    /// Stack name to asset folder name.
    pub asset_folder_aliases: HashMap<String, String>,
    #[serde(flatten)]
    pub pipeline: PipelineOptions,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            cdk_out: PathBuf::from("cdk.out"),
            templates_dir: PathBuf::from("Workshop/static/cfn"),
            assets_dir: PathBuf::from("Workshop/assets"),
            archiver: "zip".to_string(),
            template_aliases: HashMap::new(),
            asset_folder_aliases: HashMap::new(),
            pipeline: PipelineOptions::default(),
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cdk_out: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
    pub archiver: Option<String>,
}

impl PackConfig {
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        // an empty file deserializes to null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load the explicit config file, or `stackpack.yaml` when it exists.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load_file(path)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded config from {:?}", path);

        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Yaml(source) => ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Apply command-line values on top of this config.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(cdk_out) = overrides.cdk_out {
            self.cdk_out = cdk_out;
        }
        if let Some(templates_dir) = overrides.templates_dir {
            self.templates_dir = templates_dir;
        }
        if let Some(assets_dir) = overrides.assets_dir {
            self.assets_dir = assets_dir;
        }
        if let Some(archiver) = overrides.archiver {
            self.archiver = archiver;
        }
        self
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.cdk_out, &self.templates_dir, &self.assets_dir)
            .with_template_aliases(self.template_aliases.clone())
            .with_asset_folder_aliases(self.asset_folder_aliases.clone())
    }
}
