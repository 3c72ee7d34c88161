//! Command implementations

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::adapters::{ManifestFileAdapter, TomlConfigAdapter};
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::ResolvedProject;
use crate::cli::args::{AssembleArgs, PlanArgs, PlanningArgs, ValidateArgs};
use crate::cli::prompt::confirmation_for;
use crate::cli::{Cli, Commands};
use crate::config_initialization::{initialize_configuration_hierarchy, AppConfig, ConfigOverrides};
use crate::domain::model::AssemblySequence;
use crate::domain::usecases::AssemblyRequest;
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback};
use crate::engine::ProgressTracker;
use crate::output::SequenceStore;
use crate::planner::SequencePolicy;
use crate::ports::StaticConfirmation;
use crate::utils::time::format_clock;
use crate::utils::Utils;

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Plan(args) => plan(&cli, args).await,
        Commands::Validate(args) => validate(args),
        Commands::Assemble(args) => assemble(&cli, args).await,
        Commands::Config => show_config(&cli),
    }
}

fn load_config(cli: &Cli, overrides: ConfigOverrides) -> Result<AppConfig> {
    let overrides = ConfigOverrides {
        ffmpeg: cli.ffmpeg.clone(),
        ffprobe: cli.ffprobe.clone(),
        ..overrides
    };
    initialize_configuration_hierarchy(&TomlConfigAdapter::new(), cli.config.as_deref(), &overrides)
        .context("Failed to load configuration")
}

fn planning_overrides(planning: &PlanningArgs) -> ConfigOverrides {
    ConfigOverrides {
        resolution: planning.resolution.clone(),
        crossfade_duration: planning.crossfade,
        policy: planning.policy.clone(),
        broll_density: planning.density,
        media_dirs: planning.media_dirs.clone(),
        ..ConfigOverrides::default()
    }
}

/// Named policy from the config, or the manifest's own entry list for `custom`
fn select_policy(config: &AppConfig, project: &ResolvedProject) -> Result<SequencePolicy> {
    if config.policy_name.trim().eq_ignore_ascii_case("custom") {
        return match &project.custom_sequence {
            Some(entries) => Ok(SequencePolicy::Custom(entries.clone())),
            None => bail!("The custom policy needs a custom_sequence in the manifest"),
        };
    }
    Ok(config.policy()?)
}

async fn resolve_manifest(container: &DefaultAppContainer, manifest_path: &Path) -> Result<ResolvedProject> {
    let manifest = ManifestFileAdapter::load(manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let project = container
        .resolve_interactor(&manifest.media_dirs)
        .resolve(&manifest)
        .await
        .context("Failed to resolve manifest segments")?;
    Ok(project)
}

/// Execute the plan command
pub async fn plan(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let config = load_config(cli, planning_overrides(&args.planning))?;
    let container = DefaultAppContainer::new(config, Arc::new(StaticConfirmation(false)))?;

    let project = resolve_manifest(&container, &args.manifest).await?;
    let policy = select_policy(container.config(), &project)?;
    let sequence = container
        .assembly_orchestrator()
        .planner()
        .plan(&project.a_roll, &project.b_roll, &policy)?;
    let overlaps = crate::domain::rules::OverlapValidator::validate(&sequence);

    if let Some(out) = &args.out {
        container
            .sequence_store()
            .save(&sequence, out)
            .with_context(|| format!("Failed to save sequence to {}", out.display()))?;
        info!("Sequence saved to {}", out.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sequence)?);
        return Ok(());
    }

    println!("Policy: {}", policy);
    print_sequence(&sequence);
    if overlaps.is_empty() {
        println!("No duplicate audio.");
    } else {
        println!("Duplicate audio:");
        for overlap in &overlaps {
            println!("  - {}", overlap);
        }
    }
    if let Some(out) = &args.out {
        println!("Saved: {}", out.display());
    }
    Ok(())
}

/// Execute the validate command
pub fn validate(args: &ValidateArgs) -> Result<()> {
    let sequence = SequenceStore::default()
        .load(&args.sequence)
        .with_context(|| format!("Failed to load sequence {}", args.sequence.display()))?;
    let report = crate::app::ValidateInteractor::new().validate(&sequence);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Entries: {}  Total: {}",
            report.entries,
            format_clock(report.total_duration)
        );
        for overlap in &report.overlaps {
            println!("Duplicate audio: {}", overlap);
        }
        for missing in &report.missing_files {
            println!(
                "Missing file: {} ({})",
                missing.path.display(),
                missing.segment_id
            );
        }
        for error in &report.errors {
            println!("Error: {}", error);
        }
        if report.is_clean() {
            println!("Sequence is valid.");
        }
    }

    if !report.is_clean() {
        bail!("Sequence {} has problems", args.sequence.display());
    }
    Ok(())
}

/// Execute the assemble command
pub async fn assemble(cli: &Cli, args: &AssembleArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        output_dir: args.output_dir.clone(),
        jobs: args.jobs,
        crf: args.crf,
        preset: args.preset.clone(),
        ..planning_overrides(&args.planning)
    };
    let config = load_config(cli, overrides)?;
    let output_dir = config.output_dir.clone();
    let container = DefaultAppContainer::new(config, confirmation_for(args.yes))?;

    let mut request = match (&args.manifest, &args.sequence) {
        (_, Some(sequence_path)) => {
            let sequence = container
                .sequence_store()
                .load(sequence_path)
                .with_context(|| format!("Failed to load sequence {}", sequence_path.display()))?;
            AssemblyRequest::from_sequence(sequence, &output_dir)
        }
        (Some(manifest_path), None) => {
            let project = resolve_manifest(&container, manifest_path).await?;
            let policy = select_policy(container.config(), &project)?;
            AssemblyRequest::plan(project.a_roll, project.b_roll, policy, &output_dir)
        }
        (None, None) => bail!("Either --manifest or --sequence is required"),
    }
    .allow_overlap(args.yes);
    if let Some(path) = &args.save_sequence {
        request = request.save_sequence_to(path);
    }

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel_flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            handler_flag.store(true, Ordering::SeqCst);
        }
    });

    let tracker = ProgressTracker::new("assemble");
    if args.json_progress {
        tracker.add_callback(Arc::new(JsonProgressCallback::new(Arc::clone(&cancel_flag))));
    } else {
        tracker.add_callback(Arc::new(
            ConsoleProgressCallback::new(false).with_cancel_flag(Arc::clone(&cancel_flag)),
        ));
    }

    let state = container.assembly_orchestrator().assemble(request, &tracker).await;
    let result = state.result();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for diagnostic in &result.diagnostics {
            println!("[{:?}] {}: {}", diagnostic.level, diagnostic.stage, diagnostic.message);
        }
        for missing in &result.missing_files {
            println!("Missing: {} ({})", missing.path.display(), missing.segment_id);
        }
        if let Some(path) = &result.output_path {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            println!(
                "Output: {} ({}, backend {})",
                path.display(),
                Utils::format_file_size(size),
                state.backend_used.as_deref().unwrap_or("-")
            );
        }
    }

    match state.error {
        Some(err) => Err(anyhow::Error::new(err).context("Assembly failed")),
        None => Ok(()),
    }
}

/// Print the effective configuration as TOML
pub fn show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli, ConfigOverrides::default())?;
    match &config.source {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# built-in defaults"),
    }
    let rendered = TomlConfigAdapter::render(&config.to_file())?;
    print!("{}", rendered);
    Ok(())
}

fn print_sequence(sequence: &AssemblySequence) {
    println!(
        "{:>3}  {:<24} {:<16} {:<16} {:>10}",
        "#", "kind", "visual", "audio", "duration"
    );
    for entry in &sequence.entries {
        println!(
            "{:>3}  {:<24} {:<16} {:<16} {:>10}",
            entry.order_index,
            entry.kind.to_string(),
            entry.visual_source.segment_id,
            entry.audio_source,
            format_clock(entry.duration)
        );
    }
    println!(
        "Total: {} over {} entries at {}",
        format_clock(sequence.total_duration()),
        sequence.len(),
        sequence.target_resolution
    );
}
