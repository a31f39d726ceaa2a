//! CLI argument definitions.

use clap::Parser;

pub mod convert;

/// stackpack - package synthesized stacks for redistribution
#[derive(Parser, Debug)]
#[command(name = "stackpack")]
#[command(version, about = "stackpack - package synthesized stacks for redistribution")]
#[command(long_about = r#"
stackpack turns a synthesized template and its asset manifest into a
package that deploys into any account and region:

  <cdk_out>/<STACK>.template.json → <templates_dir>/<STACK>.json
  <cdk_out>/<STACK>.assets.json   → <assets_dir>/<STACK>/

Account ids and regions baked into the template are replaced with
pseudo-parameters, and asset locations with the AssetBucket and
AssetPrefix parameters.

CONFIGURATION:
  Defaults, then stackpack.yaml (or --config), then flags and
  STACKPACK_* environment variables.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Template error
  4 - Asset error
"#)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub convert: convert::ConvertArgs,
}
