//! Command-line argument definitions

use std::path::PathBuf;

use clap::{ArgGroup, Args};
use clap_num::number_range;

fn parse_crf(value: &str) -> Result<u8, String> {
    number_range(value, 0, 51)
}

fn parse_jobs(value: &str) -> Result<usize, String> {
    number_range(value, 1, 256)
}

fn parse_density(value: &str) -> Result<f64, String> {
    let density: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&density) {
        Ok(density)
    } else {
        Err(format!("density must be between 0 and 1, got {}", density))
    }
}

/// Planning options shared by `plan` and `assemble`
#[derive(Args, Debug, Clone, Default)]
pub struct PlanningArgs {
    /// Sequencing policy (no-overlap, standard, bookends, sandwich, broll-heavy, broll-full, custom)
    #[arg(long, env = "REELSMITH_POLICY")]
    pub policy: Option<String>,

    /// Share of middle segments that get B-Roll under the standard policy (0-1)
    #[arg(long, value_parser = parse_density, env = "REELSMITH_BROLL_DENSITY")]
    pub density: Option<f64>,

    /// Output resolution as WIDTHxHEIGHT
    #[arg(long, env = "REELSMITH_RESOLUTION")]
    pub resolution: Option<String>,

    /// Audio crossfade at entry boundaries, in seconds
    #[arg(long, env = "REELSMITH_CROSSFADE")]
    pub crossfade: Option<f64>,

    /// Extra directories searched for segments without a path
    #[arg(long = "media-dir", value_delimiter = ',', env = "REELSMITH_MEDIA_DIRS")]
    pub media_dirs: Vec<PathBuf>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Project manifest (YAML, JSON or TOML)
    #[arg(short, long)]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub planning: PlanningArgs,

    /// Write the planned sequence to this JSON file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the sequence as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Sequence JSON file
    #[arg(short, long)]
    pub sequence: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the assemble command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["manifest", "sequence"])))]
pub struct AssembleArgs {
    /// Project manifest to plan from
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Previously planned sequence to render as-is
    #[arg(short, long)]
    pub sequence: Option<PathBuf>,

    #[command(flatten)]
    pub planning: PlanningArgs,

    /// Directory the final video is written to
    #[arg(short, long, env = "REELSMITH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Continue past duplicate audio without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Save the planned sequence before rendering
    #[arg(long)]
    pub save_sequence: Option<PathBuf>,

    /// Number of entries normalized in parallel
    #[arg(short, long, value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Constant Rate Factor (0-51)
    #[arg(long, value_parser = parse_crf)]
    pub crf: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Emit progress as JSON lines on stdout
    #[arg(long)]
    pub json_progress: bool,

    /// Print the final result as JSON
    #[arg(long)]
    pub json: bool,
}
