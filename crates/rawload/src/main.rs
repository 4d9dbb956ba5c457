//! rawload - Main entry point

use clap::Parser;
use rawload::outcome::EXIT_FATAL;
use rawload::{Cli, Commands, FatalError};
use rawload_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut builder = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("rawload")
        // COPY of a large file always trips sqlx's slow statement warning
        .filter_directives("sqlx=error");
    if let Some(format) = cli.log_format {
        builder = builder.format(format);
    }

    // Environment variables take precedence over flags for logging only
    let log_config = match builder.build().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {}", e);
            process::exit(EXIT_FATAL);
        },
    };

    let guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {}", e);
            None
        },
    };

    let code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Batch aborted");
            eprintln!("Error: {}", e);
            EXIT_FATAL
        },
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(code);
}

/// Execute the CLI command, returning the process exit code
async fn execute_command(cli: &Cli) -> Result<i32, FatalError> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Load(args) => rawload::commands::load::run(config_path, args).await,
        Commands::Check(args) => rawload::commands::check::run(config_path, args).await,
        Commands::Mappings(args) => rawload::commands::mappings::run(config_path, args).await,
    }
}
