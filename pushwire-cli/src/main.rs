// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pushwire CLI
//!
//! Command-line interface for Pushwire - reliable push notification delivery.

mod commands;
mod config;
mod display;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "pushwire")]
#[command(version, about = "Reliable push notification delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (default: <config dir>/pushwire/config.json if present)
    #[arg(long, global = true, env = "PUSHWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Gateway environment (sandbox or production)
    #[arg(long, global = true, env = "PUSHWIRE_ENVIRONMENT")]
    environment: Option<String>,

    /// PEM file with the client certificate
    #[arg(long, global = true, env = "PUSHWIRE_CERTIFICATE")]
    certificate: Option<PathBuf>,

    /// PEM file with the private key, if not bundled with the certificate
    #[arg(long, global = true, env = "PUSHWIRE_PRIVATE_KEY")]
    private_key: Option<PathBuf>,

    /// Gateway address (host:port) replacing the environment default
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Feedback service address (host:port) replacing the environment default
    #[arg(long, global = true)]
    feedback: Option<String>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a notification to one or more devices
    Send {
        /// Hex device tokens
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Alert text
        #[arg(long, conflicts_with = "payload")]
        alert: Option<String>,

        /// Badge number
        #[arg(long, conflicts_with = "payload")]
        badge: Option<u32>,

        /// Sound file name
        #[arg(long, conflicts_with = "payload")]
        sound: Option<String>,

        /// Full JSON payload instead of --alert/--badge/--sound
        #[arg(long)]
        payload: Option<String>,

        /// Seconds until the gateway may discard the notification
        #[arg(long)]
        expires_in: Option<u64>,

        /// Delivery priority (10 immediate, 5 conserve power)
        #[arg(long)]
        priority: Option<u8>,

        /// Shorten the alert text instead of failing when the payload is too large
        #[arg(long)]
        truncate: bool,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// List devices the feedback service reports as unreachable
    Feedback {
        /// Print tuples as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and show the resolved endpoints
    Check,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("pushwire={level},pushwire_cli={level}"))
            }),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = CliConfig {
        config_file: cli.config.or_else(config::default_config_file),
        environment: cli.environment,
        certificate: cli.certificate,
        private_key: cli.private_key,
        gateway: cli.gateway,
        feedback: cli.feedback,
    };

    match cli.command {
        Commands::Send {
            tokens,
            alert,
            badge,
            sound,
            payload,
            expires_in,
            priority,
            truncate,
            json,
        } => {
            let message = commands::send::Message {
                alert,
                badge,
                sound,
                payload,
                expires_in,
                priority,
                truncate,
            };
            commands::send::run(&options.resolve()?, &tokens, &message, json)?;
        }
        Commands::Feedback { json } => commands::feedback::run(&options.resolve()?, json)?,
        Commands::Check => commands::check::run(&options.resolve()?)?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pushwire", &mut io::stdout());
        }
    }

    Ok(())
}
