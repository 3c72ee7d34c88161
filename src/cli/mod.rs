//! CLI module for Reelsmith
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;
pub mod prompt;

/// Reelsmith timeline assembler
///
/// Plans a short-form video from narration (A-Roll) and cutaway footage (B-Roll),
/// then normalizes and stitches everything into a single file with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(about = "Reelsmith - assemble narration and B-Roll into one video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "REELSMITH_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Configuration file (default: reelsmith.toml in the working directory or user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ffmpeg binary
    #[arg(long, env = "REELSMITH_FFMPEG", global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    #[arg(long, env = "REELSMITH_FFPROBE", global = true)]
    pub ffprobe: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a sequence from a project manifest without rendering
    Plan(args::PlanArgs),
    /// Check a saved sequence for duplicate audio and missing files
    Validate(args::ValidateArgs),
    /// Plan (or load) a sequence and render it to a video file
    Assemble(args::AssembleArgs),
    /// Print the effective configuration
    Config,
}
