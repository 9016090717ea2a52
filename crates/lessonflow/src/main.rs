// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lessonflow - background pipeline for lesson content.
//!
//! Binary entry point: runs the worker, sends events onto the queue, and
//! reports queue and record status counts.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod health;
mod send;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lessonflow_config::LessonflowConfig;

/// Lessonflow - background pipeline for lesson content.
#[derive(Parser, Debug)]
#[command(name = "lessonflow", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker until SIGINT or SIGTERM.
    Serve {
        /// Process everything queued, then exit.
        #[arg(long)]
        once: bool,
    },
    /// Validate an event and put it on the queue.
    Send {
        /// Wire name, e.g. `app/lesson.summarise`.
        event: String,
        /// JSON payload.
        #[arg(long, default_value = "{}")]
        data: String,
        /// Acting user id.
        #[arg(long)]
        user: Option<String>,
    },
    /// Show event queue and record status counts.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List the event catalog.
    Events,
    /// Check connectivity to every external service.
    Health,
}

fn load_config(path: Option<&PathBuf>) -> LessonflowConfig {
    let loaded = match path {
        Some(path) => lessonflow_config::load_and_validate_path(path),
        None => lessonflow_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            lessonflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    serve::init_tracing(&config);

    let result = match cli.command {
        Some(Commands::Serve { once }) => serve::run_serve(&config, once).await,
        Some(Commands::Send { event, data, user }) => {
            send::run_send(&config, &event, &data, user.as_deref()).await
        }
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Events) => {
            send::print_catalog();
            Ok(())
        }
        Some(Commands::Health) => health::run_health(&config).await,
        None => {
            println!("lessonflow: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        let config = lessonflow_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.app.name, "lessonflow");
    }

    #[test]
    fn parses_send_with_user() {
        let cli = Cli::parse_from([
            "lessonflow",
            "send",
            "app/lesson.summarise",
            "--data",
            r#"{"lessonId":"l1"}"#,
            "--user",
            "u1",
        ]);
        match cli.command {
            Some(Commands::Send { event, data, user }) => {
                assert_eq!(event, "app/lesson.summarise");
                assert_eq!(data, r#"{"lessonId":"l1"}"#);
                assert_eq!(user.as_deref(), Some("u1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn send_data_defaults_to_empty_object() {
        let cli = Cli::parse_from(["lessonflow", "send", "app/healthcheck"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Send { ref data, user: None, .. }) if data == "{}"
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["lessonflow", "status", "--json", "--config", "/tmp/lf.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lf.toml")));
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
    }

    #[test]
    fn serve_once_flag() {
        let cli = Cli::parse_from(["lessonflow", "serve", "--once"]);
        assert!(matches!(cli.command, Some(Commands::Serve { once: true })));
    }
}
