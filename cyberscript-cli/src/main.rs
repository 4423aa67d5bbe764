//! CyberScript CLI - terminal front-end for the CyberScript storyboard generator.
//!
//! Collects a target description and difficulty level, generates an
//! illustrated attack storyboard, and prints the report.

mod callback;
mod clipboard;
mod commands;
mod form;
mod render;
mod run;

use clap::Parser;
use cyberscript_core::config::ConfigOverrides;
use cyberscript_core::error::ConfigError;
use cyberscript_core::types::Complexity;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// CyberScript: illustrated cyber-attack storyboards for security training
#[derive(Parser, Debug)]
#[command(name = "cyberscript", version, about, long_about = None)]
struct Cli {
    /// Target organization description (prompts interactively if omitted)
    description: Option<String>,

    /// Difficulty level: beginner, intermediate, advanced
    #[arg(short, long)]
    complexity: Option<Complexity>,

    /// Text model to use for the scenario
    #[arg(short, long)]
    model: Option<String>,

    /// Image model to use for step illustrations
    #[arg(long)]
    image_model: Option<String>,

    /// Copy the plain-text report to the clipboard when done
    ///
    /// On X11 the clipboard contents are owned by this process, so they are
    /// lost when it exits unless a clipboard manager is running. Use
    /// --output to keep a copy of the report on disk.
    #[arg(long)]
    copy: bool,

    /// Save step images into this directory
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Write the plain-text report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the scenario as JSON instead of the rendered report
    #[arg(long)]
    json: bool,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
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
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = cyberscript_core::config::log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "cyberscript.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace).await;
    }

    // Apply CLI overrides
    let mut overrides = ConfigOverrides::default();
    overrides.generation.text_model = cli.model.clone();
    overrides.generation.image_model = cli.image_model.clone();
    overrides.ui.image_dir = cli.image_dir.clone();
    if cli.no_color {
        overrides.ui.color = Some(false);
    }

    let config = cyberscript_core::config::load_config(Some(&workspace), Some(&overrides))
        .map_err(ConfigError::from)?;
    for warning in config.generation.validate() {
        tracing::warn!("Config: {}", warning);
    }

    let request = run::RunRequest {
        description: cli.description,
        complexity: cli.complexity,
        copy: cli.copy || config.ui.copy_on_complete,
        output: cli.output,
        json: cli.json,
        quiet: cli.quiet,
    };
    run::run_storyboard(request, config).await
}
