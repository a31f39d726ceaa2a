//! Convert command - package one stack's template and assets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stackpack_assets::{AssetManifest, AssetOutcome, AssetRelocator, AssetReport, ZipArchiver};
use stackpack_template::{
    load_template, write_template, ContainerRewrite, DetectedContext, TemplatePipeline,
};

use crate::config::{ConfigOverrides, PackConfig};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Name of the synthesized stack to package
    pub stack_name: String,

    /// Config file (defaults to ./stackpack.yaml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Build output directory
    #[arg(long, env = "STACKPACK_CDK_OUT")]
    pub cdk_out: Option<PathBuf>,

    /// Directory for rewritten templates
    #[arg(long, env = "STACKPACK_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Parent directory of the per-stack asset folders
    #[arg(long, env = "STACKPACK_ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Program used to build zip archives
    #[arg(long, env = "STACKPACK_ARCHIVER")]
    pub archiver: Option<String>,
}

impl ConvertArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cdk_out: self.cdk_out.clone(),
            templates_dir: self.templates_dir.clone(),
            assets_dir: self.assets_dir.clone(),
            archiver: self.archiver.clone(),
        }
    }
}

/// What one run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub template_path: PathBuf,
    pub asset_dir: PathBuf,
    pub detected: Option<DetectedContext>,
    pub report: AssetReport,
    pub build_variables: usize,
    pub tarball_grants: usize,
    pub containers: ContainerRewrite,
}

pub async fn execute(args: ConvertArgs) -> Result<()> {
    let config = PackConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(args.overrides());

    let summary = run(&config, &args.stack_name).await?;
    print_summary(&args.stack_name, &summary);
    Ok(())
}

/// Package `stack_name` according to `config`.
///
/// Both inputs are loaded before any output directory is touched.
pub async fn run(config: &PackConfig, stack_name: &str) -> Result<RunSummary> {
    info!("Converting template for stack {}", stack_name);
    let layout = config.layout();

    let template_input = layout.template_input(stack_name);
    let template = load_template(&template_input)
        .await
        .with_context(|| format!("Failed to load template {:?}", template_input))?;

    let manifest_input = layout.manifest_input(stack_name);
    let manifest = AssetManifest::load(&manifest_input)
        .await
        .with_context(|| format!("Failed to load asset manifest {:?}", manifest_input))?;

    layout
        .prepare_templates_dir()
        .await
        .context("Failed to create templates directory")?;
    let asset_dir = layout
        .prepare_asset_dir(stack_name)
        .await
        .context("Failed to prepare asset directory")?;

    let relocator = AssetRelocator::new(
        layout.cdk_out(),
        &asset_dir,
        ZipArchiver::new(config.archiver.as_str()),
    );
    let relocation = relocator.relocate(&manifest).await;

    let outcome =
        TemplatePipeline::new(config.pipeline.clone()).run(template, stack_name, &relocation.images);

    let template_path = layout.template_output(stack_name);
    write_template(&outcome.template, &template_path)
        .await
        .with_context(|| format!("Failed to write template {:?}", template_path))?;

    info!("Template for stack {} converted", stack_name);

    Ok(RunSummary {
        template_path,
        asset_dir,
        detected: outcome.detected,
        report: relocation.report,
        build_variables: outcome.build_variables,
        tarball_grants: outcome.tarball_grants,
        containers: outcome.containers,
    })
}

fn print_summary(stack_name: &str, summary: &RunSummary) {
    for line in summary_lines(stack_name, summary) {
        println!("{}", line);
    }
}

/// Lines of the end-of-run summary, failed assets with their reasons last.
fn summary_lines(stack_name: &str, summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        match &summary.detected {
            Some(context) => format!(
                "✅ Converted {} (account {}, region {} parameterized)",
                stack_name, context.account_id, context.region
            ),
            None => format!("⚠️  Converted {} without literal replacement", stack_name),
        },
        format!("   Template: {}", summary.template_path.display()),
        format!("   Assets:   {}", summary.asset_dir.display()),
        format!(
            "   {} build variable(s), {} tarball grant(s), {} container image(s) retargeted",
            summary.build_variables, summary.tarball_grants, summary.containers.containers
        ),
    ];
    if let Some(tag) = &summary.containers.canonical_tag {
        lines.push(format!("   Canonical image: {}", tag));
    }

    let report = &summary.report;
    lines.push(format!(
        "   {} written, {} skipped, {} failed",
        report.written().len(),
        report.skipped().len(),
        report.failed().len()
    ));
    for record in report.failed() {
        if let AssetOutcome::Failed { reason } = &record.outcome {
            lines.push(format!("   ❌ {} ({}): {}", record.asset_id, record.kind, reason));
        }
    }
    lines
}
