#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use tracing_subscriber::EnvFilter;

use runlog_oxide::constants::config::CONFIG_FILE;
use runlog_oxide::{ExperimentConfig, pipeline, presets};

mod app;
mod perf;
mod state;
mod ui;

const DEFAULT_PRESET: &str = "clicks";

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulation telemetry charts and summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive chart viewer
    View(ConfigArgs),
    /// Run the pipeline headless and print the summaries
    Summary {
        #[command(flatten)]
        args: ConfigArgs,
        /// Print the full report as JSON instead of text
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List the built-in presets
    Presets,
    /// Write a preset as an editable JSON configuration
    ExportConfig {
        preset: String,
        #[arg(short, long, default_value = CONFIG_FILE, value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ConfigArgs {
    /// Telemetry log (CSV or Parquet)
    #[arg(value_hint = ValueHint::FilePath)]
    file: Option<PathBuf>,
    /// Built-in preset name
    #[arg(short, long, conflicts_with = "config")]
    preset: Option<String>,
    /// JSON configuration file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// More verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

/// `--config`, then `--preset`, then `./runlog-oxide.json`, then the default preset
fn resolve_config(args: &ConfigArgs) -> Result<ExperimentConfig> {
    if let Some(path) = &args.config {
        return ExperimentConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()));
    }
    if let Some(name) = &args.preset {
        return Ok(presets::preset(name)?);
    }
    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        tracing::info!(path = %local.display(), "using local configuration");
        return ExperimentConfig::load(local)
            .with_context(|| format!("loading configuration {}", local.display()));
    }
    Ok(presets::preset(DEFAULT_PRESET)?)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(feature = "profile-with-puffin")]
fn start_puffin_server() -> Option<puffin_http::Server> {
    puffin::set_scopes_on(true);
    match puffin_http::Server::new(&format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT)) {
        Ok(server) => {
            tracing::info!(port = puffin_http::DEFAULT_PORT, "puffin server listening");
            Some(server)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to start puffin server");
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Some(Command::View(args)) | Some(Command::Summary { args, .. }) => args.verbose,
        _ => false,
    };
    init_logging(verbose);

    match cli.command.unwrap_or(Command::View(ConfigArgs::default())) {
        Command::View(args) => handle_view(args),
        Command::Summary { args, json } => handle_summary(args, json),
        Command::Presets => {
            for (name, description) in presets::catalog() {
                println!("{:<12}{}", name, description);
            }
            Ok(())
        }
        Command::ExportConfig { preset, output } => {
            let config = presets::preset(&preset)?;
            config
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote preset '{}' to {}", config.name, output.display());
            Ok(())
        }
    }
}

fn handle_view(args: ConfigArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    #[cfg(feature = "profile-with-puffin")]
    let _puffin_server = start_puffin_server();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "RunLog Oxide",
        options,
        Box::new(move |_| Ok(Box::new(app::ReportViewer::new(config, args.file)))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}

fn handle_summary(args: ConfigArgs, json: bool) -> Result<()> {
    let config = resolve_config(&args)?;
    let file = args
        .file
        .as_deref()
        .ok_or_else(|| anyhow!("no input file supplied"))?;

    let report = pipeline::run_file(file, &config)
        .with_context(|| format!("running '{}' over {}", config.name, file.display()))?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", pipeline::render_summary_text(&report));
    }
    Ok(())
}
