// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tripcast - WhatsApp batch dispatch and retry engine.
//!
//! This is the binary entry point: the long-running `serve` command and
//! one-shot operator commands that mirror the HTTP API.

mod app;
mod commands;
mod output;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputMode;

/// Tripcast - WhatsApp batch dispatch and retry engine.
#[derive(Parser, Debug)]
#[command(name = "tripcast", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the standard lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and the background retry sweep.
    Serve,
    /// Store an upload from a JSON document `{"upload": {...}, "travelers": [...]}`.
    Ingest {
        /// Path to the upload document.
        file: PathBuf,
    },
    /// Send every record of an upload that still needs delivery.
    Dispatch {
        upload_id: String,
        /// Replaces the free-text template parameter for this batch.
        #[arg(long)]
        message: Option<String>,
    },
    /// Send one traveler record now.
    Send { traveler_id: String },
    /// Retry failed records of an upload.
    Retry {
        upload_id: String,
        /// Retry ceiling for this run instead of `retry.max_retries`.
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Show the state of an upload, or of a whole day with `--date`.
    Status {
        upload_id: Option<String>,
        /// Day to summarize (YYYY-MM-DD); defaults to today.
        #[arg(long, conflicts_with = "upload_id")]
        date: Option<String>,
    },
    /// Show today's (or `--date`'s) quota usage.
    Usage {
        #[arg(long)]
        date: Option<String>,
        /// Agency counter, when quotas are per agency.
        #[arg(long)]
        agency: Option<String>,
    },
    /// Show the retry-count histogram for a day.
    Analytics {
        #[arg(long)]
        date: Option<String>,
    },
    /// Move template-required records of an upload back to pending.
    RequeueTemplates { upload_id: String },
    /// Replace the phone of a record rejected as invalid so retries pick it up.
    CorrectPhone { traveler_id: String, phone: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tripcast_config::load_and_validate_path(path),
        None => tripcast_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tripcast_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let mode = OutputMode::detect(cli.json, cli.plain);
    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Ingest { file } => commands::run_ingest(config, &file, mode).await,
        Commands::Dispatch { upload_id, message } => {
            commands::run_dispatch(config, &upload_id, message.as_deref(), mode).await
        }
        Commands::Send { traveler_id } => commands::run_send(config, &traveler_id, mode).await,
        Commands::Retry {
            upload_id,
            max_attempts,
        } => commands::run_retry(config, &upload_id, max_attempts, mode).await,
        Commands::Status { upload_id, date } => {
            commands::run_status(config, upload_id.as_deref(), date.as_deref(), mode).await
        }
        Commands::Usage { date, agency } => {
            commands::run_usage(config, date.as_deref(), agency.as_deref(), mode).await
        }
        Commands::Analytics { date } => {
            commands::run_analytics(config, date.as_deref(), mode).await
        }
        Commands::RequeueTemplates { upload_id } => {
            commands::run_requeue_templates(config, &upload_id, mode).await
        }
        Commands::CorrectPhone { traveler_id, phone } => {
            commands::run_correct_phone(config, &traveler_id, &phone, mode).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tripcast={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_dispatch_with_override() {
        let cli = Cli::try_parse_from([
            "tripcast",
            "--json",
            "dispatch",
            "u-42",
            "--message",
            "Board at gate 3",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Dispatch { upload_id, message } => {
                assert_eq!(upload_id, "u-42");
                assert_eq!(message.as_deref(), Some("Board at gate 3"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_retry_ceiling_and_global_config() {
        let cli = Cli::try_parse_from([
            "tripcast",
            "retry",
            "u-42",
            "--max-attempts",
            "5",
            "--config",
            "/tmp/tripcast.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tripcast.toml")));
        assert!(matches!(
            cli.command,
            Commands::Retry {
                max_attempts: Some(5),
                ..
            }
        ));
    }

    #[test]
    fn status_rejects_upload_and_date_together() {
        assert!(
            Cli::try_parse_from(["tripcast", "status", "u-1", "--date", "2026-03-01"]).is_err()
        );
    }

    #[test]
    fn requeue_command_is_kebab_case() {
        let cli = Cli::try_parse_from(["tripcast", "requeue-templates", "u-1"]).unwrap();
        assert!(matches!(cli.command, Commands::RequeueTemplates { .. }));
    }

    #[test]
    fn correct_phone_takes_id_and_phone() {
        let cli =
            Cli::try_parse_from(["tripcast", "correct-phone", "t-9", "9900408817"]).unwrap();
        match cli.command {
            Commands::CorrectPhone { traveler_id, phone } => {
                assert_eq!(traveler_id, "t-9");
                assert_eq!(phone, "9900408817");
            }
            _ => panic!("expected correct-phone"),
        }
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tripcast_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "tripcast");
    }
}
