use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod commands;
mod config;
mod conversation;
mod error;
mod instruction;
mod service;

use cli::{Cli, Commands};
use config::{Config, LogLevel};
use error::SessionError;

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lore")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("lore.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.parse_filters(log_level.as_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let quiet = cli.quiet;
    let command = cli.command.unwrap_or(Commands::Chat { file: None, keep: false });

    match command {
        Commands::Chat { file, keep } => commands::chat::run(file, keep, quiet, &config),
        Commands::Prompt { file } => commands::prompt::run(file, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Init { path, force } => commands::init::run(path, force),
        Commands::Doctor => commands::doctor::run(&config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

/// Print the error chain, plus setup guidance when the remote session could not be opened
fn report(err: &eyre::Report) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".red(), cause);
    }

    if err.chain().any(|cause| cause.downcast_ref::<SessionError>().is_some()) {
        eprintln!();
        eprintln!("{}", "The agent service could not be reached or refused the request.".red());
        eprintln!("Check that:");
        eprintln!("  - {} points at a provisioned service", "service.endpoint".cyan());
        eprintln!("  - {} names a model deployed there", "service.model_name".cyan());
        eprintln!("  - the API key is valid for that service");
        eprintln!("Run {} to review your setup.", "lore doctor".cyan());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = match Config::load(cli.config.as_ref()).context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    // Logging is best effort
    if let Err(e) = setup_logging(&config.log_level) {
        eprintln!("{} {:#}", "⚠".yellow(), e);
    }

    info!("Starting lore with config from: {:?}", config.loaded_from);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            report(&e);
            ExitCode::FAILURE
        }
    }
}
