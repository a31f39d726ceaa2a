//! Retargeting container images at a synthesized image repository.
//!
//! The build step publishes container images to a bootstrap repository
//! and wires task definitions to them by content-hash tag. A packaged
//! template cannot rely on that repository, so matching container
//! definitions are pointed at a repository the stack creates itself, and
//! the image tarball is shipped with the other assets.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stackpack_assets::ImageAsset;
use tracing::{debug, info, warn};

use crate::document::{ensure_section, resources_of_type_mut, OUTPUTS, PARAMETERS, RESOURCES};
use crate::intrinsic::{self, SUB};

pub const ECS_TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
pub const ECR_REPOSITORY: &str = "AWS::ECR::Repository";

pub const TARBALL_KEY_PARAMETER: &str = "DockerImageTarballKey";
pub const LEGACY_IMAGE_URI_PARAMETER: &str = "LoadGeneratorImageUri";

/// Naming of the synthesized image repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRepositoryOptions {
    /// Logical id of the repository resource.
    pub logical_id: String,
    /// Physical `RepositoryName`.
    pub repository_name: String,
}

impl Default for ImageRepositoryOptions {
    fn default() -> Self {
        Self {
            logical_id: "LoadGeneratorECRRepository".to_string(),
            repository_name: "powertools-workshop-load-generator".to_string(),
        }
    }
}

impl ImageRepositoryOptions {
    /// Name of the output exposing the repository URI.
    pub fn output_name(&self) -> String {
        format!("{}Uri", self.logical_id)
    }
}

/// Result of a container rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRewrite {
    /// Container definitions pointed at the repository.
    pub containers: usize,
    /// Tag of the image treated as canonical, when any.
    pub canonical_tag: Option<String>,
}

pub struct ContainerImageRewriter {
    options: ImageRepositoryOptions,
    tag_pattern: Regex,
}

impl ContainerImageRewriter {
    pub fn new(options: ImageRepositoryOptions) -> Self {
        Self {
            options,
            tag_pattern: Regex::new(r":([a-f0-9]{64})$").expect("image tag pattern is valid"),
        }
    }

    /// Image reference to the `latest` tag of the synthesized repository.
    pub fn image_reference(&self) -> Value {
        intrinsic::sub(format!(
            "${{AWS::AccountId}}.dkr.ecr.${{AWS::Region}}.${{AWS::URLSuffix}}/${{{}}}:latest",
            self.options.logical_id
        ))
    }

    /// Rewrite container images and add the repository, its parameters and
    /// its output. Does nothing when `images` is empty.
    ///
    /// Only the first image is canonical: its tarball name becomes the
    /// default of the tarball key parameter.
    pub fn rewrite(&self, template: &mut Value, images: &[ImageAsset]) -> ContainerRewrite {
        let Some(canonical) = images.first() else {
            return ContainerRewrite::default();
        };
        if images.len() > 1 {
            warn!(
                "{} container images found; only {} is used for the image repository",
                images.len(),
                canonical.asset_id
            );
        }

        let containers = self.retarget_containers(template, images);
        self.add_repository(template, canonical);
        info!(
            "Added image repository {} ({} container definition(s) retargeted)",
            self.options.logical_id, containers
        );

        ContainerRewrite {
            containers,
            canonical_tag: Some(canonical.image_tag.clone()),
        }
    }

    fn matching_tag<'v>(&self, image: &'v Value) -> Option<&'v str> {
        let text = image.get(SUB)?.as_str()?;
        self.tag_pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn retarget_containers(&self, template: &mut Value, images: &[ImageAsset]) -> usize {
        let mut retargeted = 0;

        for (logical_id, task) in resources_of_type_mut(template, &[ECS_TASK_DEFINITION]) {
            let Some(containers) = task
                .pointer_mut("/Properties/ContainerDefinitions")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };

            for container in containers.iter_mut() {
                let Some(image) = container.get_mut("Image") else {
                    continue;
                };
                let known = self
                    .matching_tag(image)
                    .map(|tag| images.iter().any(|asset| asset.image_tag == tag))
                    .unwrap_or(false);
                if known {
                    *image = self.image_reference();
                    retargeted += 1;
                    debug!("Retargeted container image in {}", logical_id);
                }
            }
        }

        retargeted
    }

    fn add_repository(&self, template: &mut Value, canonical: &ImageAsset) {
        if let Some(resources) = ensure_section(template, RESOURCES) {
            resources.insert(self.options.logical_id.clone(), self.repository_resource());
        }

        if let Some(parameters) = ensure_section(template, PARAMETERS) {
            parameters.insert(
                TARBALL_KEY_PARAMETER.to_string(),
                json!({
                    "Type": "String",
                    "Description": "S3 key for the Docker image tarball",
                    "Default": canonical.tarball_name,
                }),
            );
            parameters.insert(
                LEGACY_IMAGE_URI_PARAMETER.to_string(),
                json!({
                    "Type": "String",
                    "Description": "Docker image URI for load generator (deprecated - using ECR repository instead)",
                    "Default": "",
                }),
            );
        }

        if let Some(outputs) = ensure_section(template, OUTPUTS) {
            outputs.insert(
                self.options.output_name(),
                json!({
                    "Description": "URI of the ECR repository for the load generator",
                    "Value": intrinsic::get_att(&self.options.logical_id, "RepositoryUri"),
                }),
            );
        }
    }

    fn repository_resource(&self) -> Value {
        json!({
            "Type": ECR_REPOSITORY,
            "Properties": {
                "RepositoryName": self.options.repository_name,
                "ImageScanningConfiguration": {"ScanOnPush": false},
                "LifecyclePolicy": {"LifecyclePolicyText": lifecycle_policy_text()},
            }
        })
    }
}

impl Default for ContainerImageRewriter {
    fn default() -> Self {
        Self::new(ImageRepositoryOptions::default())
    }
}

/// Compact lifecycle policy keeping only the newest image.
pub fn lifecycle_policy_text() -> String {
    json!({
        "rules": [{
            "rulePriority": 1,
            "description": "Keep only the latest image",
            "selection": {
                "tagStatus": "any",
                "countType": "imageCountMoreThan",
                "countNumber": 1
            },
            "action": {"type": "expire"}
        }]
    })
    .to_string()
}
