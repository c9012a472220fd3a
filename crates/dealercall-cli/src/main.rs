//! dealercall - place and track outbound dealer voice calls
//!
//! Thin command-line front end over `dealercall-client`, mainly for
//! checking a deployment's voice configuration and following test calls.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dealercall_client::CallController;
use dealercall_core::{EnvSource, VoiceCallConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::CallArgs;
use crate::config::{Config, VoiceOverrides};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "dealercall")]
#[command(author, version, about = "Dealer voice call CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DEALERCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Voice API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Assistant used for calls
    #[arg(long)]
    assistant_id: Option<String>,

    /// Provider id of the number calls are placed from
    #[arg(long)]
    phone_number_id: Option<String>,

    /// Endpoint the provider pushes call events to
    #[arg(long)]
    webhook_url: Option<String>,

    /// Retries for connection failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-request deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether voice calling is configured
    Status,

    /// Place an outbound call
    Call(CallArgs),

    /// Show the current state of a call
    Get {
        /// Call ID
        id: String,

        /// Print the transcript, if any
        #[arg(long)]
        transcript: bool,
    },

    /// Follow a call until it ends
    Watch {
        /// Call ID
        id: String,

        /// Seconds between polls
        #[arg(long, default_value = "3")]
        interval: u64,

        /// Stop after this many seconds
        #[arg(long, default_value = "600")]
        timeout: u64,
    },

    /// Cancel a call
    Cancel {
        /// Call ID
        id: String,
    },

    /// List a customer's recent calls
    History {
        /// Customer id calls were placed under (default for a shopper: first_last, lowercased)
        #[arg(long)]
        customer: String,

        /// Number of calls to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

impl Cli {
    fn overrides(&self) -> VoiceOverrides {
        VoiceOverrides {
            base_url: self.base_url.clone(),
            assistant_id: self.assistant_id.clone(),
            phone_number_id: self.phone_number_id.clone(),
            webhook_url: self.webhook_url.clone(),
            max_retries: self.max_retries,
            timeout_ms: self.timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins when set
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };

    let format = match cli.output {
        Some(format) => format,
        None => match config.output() {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid output format in config file: {}", e))?,
            None => OutputFormat::default(),
        },
    };
    let ctx = OutputContext::new(format, cli.no_color || config.no_color(), cli.quiet);

    let voice = config.voice_config(&EnvSource, &cli.overrides());
    tracing::debug!(config = ?voice, "Resolved voice configuration");

    match &cli.command {
        Commands::Status => {
            commands::status(&voice, &ctx)?;
        }

        Commands::Call(args) => {
            let controller = create_controller(voice)?;
            commands::call(&controller, args, &ctx).await?;
        }

        Commands::Get { id, transcript } => {
            let controller = create_controller(voice)?;
            commands::get(&controller, id, *transcript, &ctx).await?;
        }

        Commands::Watch {
            id,
            interval,
            timeout,
        } => {
            let controller = create_controller(voice)?;
            commands::watch(
                &controller,
                id,
                Duration::from_secs((*interval).max(1)),
                Duration::from_secs(*timeout),
                &ctx,
            )
            .await?;
        }

        Commands::Cancel { id } => {
            let controller = create_controller(voice)?;
            commands::cancel(&controller, id, &ctx).await?;
        }

        Commands::History { customer, limit } => {
            let controller = create_controller(voice)?;
            commands::history(&controller, customer, *limit, &ctx).await?;
        }
    }

    Ok(())
}

/// Create an HTTP-backed controller for the resolved configuration
fn create_controller(config: VoiceCallConfig) -> Result<CallController> {
    CallController::http(config).context("Failed to create voice API client")
}
