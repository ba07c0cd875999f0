//! Reframe CLI: apply aspect-ratio crops, zooms, color presets, green-screen
//! compositing, and silence trimming to uploaded videos.
//!
//! Usage:
//!   reframe render <VIDEO> [OPTIONS]   Render one video
//!   reframe plan <VIDEO> [OPTIONS]     Print the ffmpeg command without running it
//!   reframe batch <MANIFEST>           Render every request in a JSON manifest
//!   reframe options                    List the selectable ratios, filters, and zooms
//!   reframe check                      Check that ffmpeg and ffprobe are usable

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reframe_common::config::AppConfig;

mod commands;

use commands::RequestArgs;

#[derive(Parser)]
#[command(
    name = "reframe",
    about = "Reframe, crop, restyle, and key videos with ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/reframe/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one video
    Render {
        #[command(flatten)]
        request: RequestArgs,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Delete the uploaded inputs after a successful render
        #[arg(long)]
        cleanup_inputs: bool,
    },

    /// Print the ffmpeg command for a request without running it
    Plan {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the assembled job as JSON instead of a command line
        #[arg(long)]
        json: bool,
    },

    /// Render every request in a JSON manifest (an array of form-field maps)
    Batch {
        /// Path to the manifest
        manifest: PathBuf,

        /// Maximum renders running at once (overrides the configured value)
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },

    /// List the selectable aspect ratios, filters, and zoom levels
    Options {
        /// Print the catalogs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the configured ffmpeg and ffprobe are usable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reframe_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Render {
            request,
            output_dir,
            cleanup_inputs,
        } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            commands::render::run(&config, request, cleanup_inputs).await
        }
        Commands::Plan { request, json } => commands::plan::run(&config, request, json).await,
        Commands::Batch { manifest, jobs } => {
            if let Some(jobs) = jobs {
                config.worker.max_concurrent_jobs = jobs;
            }
            commands::batch::run(&config, manifest).await
        }
        Commands::Options { json } => commands::options::run(&config, json),
        Commands::Check => commands::check::run(&config).await,
    }
}
