//! Reelsmith timeline assembler
//!
//! Stitches narration clips (A-Roll) and cutaway footage (B-Roll) into a single
//! short-form video using ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! reelsmith plan --manifest project.yaml --policy standard --out sequence.json
//! reelsmith validate --sequence sequence.json
//! reelsmith assemble --sequence sequence.json --output-dir renders
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use reelsmith::cli::{commands, Cli};
use reelsmith::utils::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format).map_err(|e| anyhow::anyhow!(e))?;
    info!("Starting Reelsmith {}", env!("CARGO_PKG_VERSION"));

    commands::run(cli).await
}
