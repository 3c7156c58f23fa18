//! detlaunch CLI — launches detector training runs.
//!
//! Picks the epoch schedule for the configured model, then runs the training
//! program either directly or under `torch.distributed.run`.

mod commands;

use clap::Parser;
use detlaunch_core::LaunchError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// detlaunch: single-machine launcher for YOLO-family training runs
#[derive(Parser, Debug)]
#[command(name = "detlaunch", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (training script and `.detlaunch/config.toml` live here)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Launch a training run with WORLD_SIZE worker processes (1 to 8)
    Train(TrainArgs),
    /// Show the epoch schedule selected for a model name
    Schedule {
        /// Model identifier, e.g. yolox_s
        model: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage fixed training presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct TrainArgs {
    /// Number of training processes; 1 runs single-process, 2-8 run distributed
    #[arg(allow_negative_numbers = true)]
    world_size: i64,

    /// Model identifier (selects the epoch schedule)
    #[arg(short, long)]
    model: Option<String>,

    /// Dataset name
    #[arg(short, long)]
    dataset: Option<String>,

    /// Dataset root directory
    #[arg(long)]
    root: Option<String>,

    #[arg(long)]
    batch_size: Option<u32>,

    #[arg(long)]
    img_size: Option<u32>,

    /// Checkpoint to resume from
    #[arg(long)]
    resume: Option<String>,

    /// Rendezvous port for distributed runs
    #[arg(long)]
    master_port: Option<u16>,

    /// Print the command line instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Extra arguments forwarded to the training script
    #[arg(last = true)]
    extra: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
enum PresetAction {
    /// List presets; the active one is marked with `*`
    List,
    /// Show a preset's command line (active preset if omitted)
    Show {
        name: Option<String>,
    },
    /// Run a preset (active preset if omitted)
    Run {
        name: Option<String>,
        /// Print the command line instead of running it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "detlaunch", "detlaunch")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "detlaunch.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    match commands::handle_command(cli.command, &workspace).await {
        Ok(code) => code,
        Err(e) => report(&e),
    }
}

/// Print a failed command's error on stderr and pick the process exit status.
fn report(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<LaunchError>() {
        // Worker-count errors are printed bare, like the launcher's usage message.
        Some(err) if err.is_world_size() => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
        Some(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        }
        None => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
