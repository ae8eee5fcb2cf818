//! hotplug-indexer CLI - Index files on hot-plugged storage volumes
//!
//! Usage:
//!   hotplug-indexer                 - Detect volumes and index them
//!   hotplug-indexer index [PATHS]   - Index the given roots instead of detected volumes
//!   hotplug-indexer volumes         - Show detected volumes without indexing

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use hotplug_indexer::{
    detect_volumes, index_roots, run, Config, FileIndex, IndexEvent, IndexSummary, LsblkLister,
    MountFilter, RunOutcome,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// hotplug-indexer - Catalog the files on your external drives
#[derive(Parser)]
#[command(name = "hotplug-indexer")]
#[command(about = "Index files on hot-plugged storage volumes into SQLite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.config/hotplug-indexer/hotplug-indexer.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Index database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect hot-plugged volumes and index their files (default)
    Index {
        /// Index these directories instead of detected volumes
        paths: Vec<PathBuf>,
    },

    /// List detected hot-plugged volumes without indexing
    Volumes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("hotplug_indexer={}", log_level).parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        None => cmd_index(&config, &[]),
        Some(Commands::Index { paths }) => cmd_index(&config, &paths),
        Some(Commands::Volumes) => cmd_volumes(&config),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }

    Ok(config)
}

// ============ INDEX COMMAND ============

fn cmd_index(config: &Config, paths: &[PathBuf]) -> Result<()> {
    println!("{}", "💾 hotplug-indexer".bold().cyan());
    println!(
        "Database: {}",
        config.database_path.display().to_string().dimmed()
    );
    println!();

    // Progress lines belong on stdout with the rest of the report
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .context("Invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let summary = if paths.is_empty() {
        let lister = LsblkLister::from_config(&config.lsblk);
        match run(config, &lister, |event| report_event(&pb, event))? {
            RunOutcome::NoVolumes => {
                pb.finish_and_clear();
                println!(
                    "{}",
                    "No external drives detected. Nothing to index.".yellow()
                );
                return Ok(());
            }
            RunOutcome::Indexed { summary, .. } => summary,
        }
    } else {
        let roots = absolute_paths(paths)?;
        let mut index = FileIndex::open(&config.database_path)?;
        index_roots(&mut index, &roots, config.progress_interval, |event| {
            report_event(&pb, event)
        })?
    };

    pb.finish_and_clear();
    print_summary(&summary);

    Ok(())
}

fn report_event(pb: &ProgressBar, event: IndexEvent<'_>) {
    match event {
        IndexEvent::VolumesDetected(volumes) => {
            let list: Vec<String> = volumes.iter().map(|v| v.display().to_string()).collect();
            emit(pb, format!("Detected external drives: {:?}", list));
        }
        IndexEvent::RootStarted(root) => {
            pb.set_message(format!("Scanning {}", root.display()));
            emit(
                pb,
                format!("{} {}", "Scanning drive:".cyan(), root.display()),
            );
        }
        IndexEvent::RootSkipped { root, error } => {
            emit(
                pb,
                format!(
                    "  {} {}: {}",
                    "✗ Error accessing drive".red(),
                    root.display(),
                    error
                ),
            );
        }
        IndexEvent::Progress(count) => {
            emit(pb, format!("  Indexed {} files so far...", count));
        }
        IndexEvent::RootFinished { root, stats } => {
            let skipped = if stats.skipped > 0 {
                format!(" ({} skipped)", stats.skipped).yellow().to_string()
            } else {
                String::new()
            };
            emit(
                pb,
                format!(
                    "  {} {} files from {}{}",
                    "✓".green(),
                    stats.inserted,
                    root.display(),
                    skipped
                ),
            );
        }
    }
}

/// Print a line above the spinner, or plainly when the spinner is hidden.
fn emit(pb: &ProgressBar, line: String) {
    if pb.is_hidden() {
        println!("{}", line);
    } else {
        pb.println(line);
    }
}

fn print_summary(summary: &IndexSummary) {
    println!();
    println!(
        "{} Total files indexed: {}",
        "✓ Indexing complete!".green().bold(),
        summary.indexed.to_string().cyan()
    );

    if summary.skipped_files > 0 || summary.skipped_roots > 0 {
        println!(
            "  {}",
            format!(
                "Skipped {} files and {} drives",
                summary.skipped_files, summary.skipped_roots
            )
            .yellow()
        );
    }

    if summary.indexed == 0 && summary.roots_scanned > 0 {
        println!("  {}", "Drives were scanned but contained no files.".dimmed());
    }
}

fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir().context("Cannot resolve current directory")?;
    Ok(paths.iter().map(|p| absolutize(&cwd, p)).collect())
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

// ============ VOLUMES COMMAND ============

fn cmd_volumes(config: &Config) -> Result<()> {
    println!("{}", "🔌 Hot-plugged volumes".bold().cyan());
    println!();

    let lister = LsblkLister::from_config(&config.lsblk);
    let volumes = detect_volumes(&lister, &MountFilter::from_config(&config.filter));

    if volumes.is_empty() {
        println!("{}", "No external drives detected.".yellow());
        return Ok(());
    }

    for (idx, volume) in volumes.iter().enumerate() {
        println!(
            "  {}. {}",
            (idx + 1).to_string().cyan(),
            volume.display().to_string().white().bold()
        );
    }

    println!();
    Ok(())
}
