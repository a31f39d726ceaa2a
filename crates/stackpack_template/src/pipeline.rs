//! Composition of the template passes for one stack.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stackpack_assets::ImageAsset;
use tracing::{debug, info, warn};

use crate::container::{ContainerImageRewriter, ContainerRewrite, ImageRepositoryOptions};
use crate::detect::{DetectedContext, LiteralDetector};
use crate::join::JoinNormalizer;
use crate::parameters::{LanguageParameter, ParameterInjector, DEFAULT_SERVICES_STACK};
use crate::pseudo::PseudoParameterRewriter;
use crate::resources;
use crate::sanitize::sanitize;

/// Stack-specific knobs of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Stack that receives the language parameter.
    pub services_stack: String,
    pub language: LanguageParameter,
    pub image_repository: ImageRepositoryOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            services_stack: DEFAULT_SERVICES_STACK.to_string(),
            language: LanguageParameter::default(),
            image_repository: ImageRepositoryOptions::default(),
        }
    }
}

/// The rewritten template and what happened to it.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub template: Value,
    /// `None` when no account id or region was found; the template then
    /// still carries its literals.
    pub detected: Option<DetectedContext>,
    pub build_variables: usize,
    pub tarball_grants: usize,
    pub containers: ContainerRewrite,
}

/// Runs every template pass in order.
pub struct TemplatePipeline {
    injector: ParameterInjector,
    containers: ContainerImageRewriter,
    detector: LiteralDetector,
    normalizer: JoinNormalizer,
}

impl Default for TemplatePipeline {
    fn default() -> Self {
        Self::new(PipelineOptions::default())
    }
}

impl TemplatePipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            injector: ParameterInjector::new(options.services_stack)
                .with_language(options.language),
            containers: ContainerImageRewriter::new(options.image_repository),
            detector: LiteralDetector::new(),
            normalizer: JoinNormalizer::new(),
        }
    }

    /// Rewrite `template` for `stack_name`.
    ///
    /// Resource-specific rewriters run before literal detection so the
    /// bootstrap locations they replace do not count towards it. When no
    /// account id or region is detected the literal passes are skipped and
    /// the sanitized template is returned as is.
    pub fn run(&self, mut template: Value, stack_name: &str, images: &[ImageAsset]) -> PipelineOutcome {
        sanitize(&mut template);
        self.injector.inject(&mut template, stack_name);

        let build_variables = resources::rewrite_build_environment(&mut template);
        let tarball_grants = resources::rewrite_tarball_grants(&mut template);
        let containers = self.containers.rewrite(&mut template, images);
        debug!(
            "Resource rewrites: {} build variable(s), {} tarball grant(s)",
            build_variables, tarball_grants
        );

        let detected = self.detector.detect(&template);
        let template = match &detected {
            Some(context) => {
                info!(
                    "Detected account {} and region {}",
                    context.account_id, context.region
                );
                let rewritten = PseudoParameterRewriter::new(context).rewrite(template);
                self.normalizer.normalize(rewritten)
            }
            None => {
                warn!(
                    "Could not detect account id or region in {}; skipping literal replacement",
                    stack_name
                );
                template
            }
        };

        PipelineOutcome {
            template,
            detected,
            build_variables,
            tarball_grants,
            containers,
        }
    }
}
