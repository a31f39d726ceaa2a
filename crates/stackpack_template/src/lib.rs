//! # stackpack_template
//!
//! Rewrites a synthesized template into an environment-agnostic one.
//!
//! The passes, in the order [`TemplatePipeline`] runs them:
//!
//! - Sanitizer: drops bootstrap rules, parameters and build metadata
//! - Parameter injector: adds `AssetBucket`/`AssetPrefix` and points
//!   archive-deployed code at them
//! - Resource rewriters: build project variables, tarball grants and
//!   container images
//! - Literal detector: finds the account id and region to replace
//! - Pseudo-parameter rewriter: replaces those literals with references
//! - Join normalizer: repairs placeholders inside joins and outputs
//!
//! ## Example
//!
//! ```rust,no_run
//! use stackpack_template::{load_template, write_template, TemplatePipeline};
//!
//! # async fn run() -> stackpack_template::TemplateResult<()> {
//! let template = load_template("cdk.out/ApiStack.template.json".as_ref()).await?;
//! let outcome = TemplatePipeline::default().run(template, "ApiStack", &[]);
//! write_template(&outcome.template, "dist/cfn/ApiStack.json".as_ref()).await?;
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod detect;
pub mod document;
pub mod error;
pub mod intrinsic;
pub mod join;
pub mod parameters;
pub mod pipeline;
pub mod pseudo;
pub mod resources;
pub mod sanitize;
pub mod segments;

pub use container::{ContainerImageRewriter, ContainerRewrite, ImageRepositoryOptions};
pub use detect::{DetectedContext, LiteralDetector};
pub use document::{load_template, parse_template, render_template, write_template};
pub use error::{TemplateError, TemplateResult};
pub use join::JoinNormalizer;
pub use parameters::{LanguageParameter, ParameterInjector, ASSET_BUCKET, ASSET_PREFIX};
pub use pipeline::{PipelineOptions, PipelineOutcome, TemplatePipeline};
pub use pseudo::PseudoParameterRewriter;
pub use sanitize::sanitize;
