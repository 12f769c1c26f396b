//! simlink: connect a simulation to a remote training platform.
//!
//! Provides subcommands:
//!
//! - `run`      -- Register the point-mass demo simulation and drive it from
//!   platform events until the platform ends the session
//! - `validate` -- Check an interface descriptor file and print it normalised

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use simlink::config::ConnectorConfig;
use simlink::platform::{HttpPlatformClient, PlatformClient, ScriptedPlatform};
use simlink::session::{validate_interface, SessionAdapter};
use simlink::sim::{PointMass, RunSummary, SimRunner};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// simlink: connect a simulation to a remote training platform
#[derive(Parser)]
#[command(name = "simlink", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults and SIM_* env vars if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the demo simulation and serve platform events.
    Run {
        /// Interface descriptor JSON (defaults to the point-mass interface).
        #[arg(long)]
        interface: Option<PathBuf>,

        /// Re-register when the platform unregisters the simulator.
        #[arg(long)]
        retry: bool,

        /// Use a scripted in-memory platform instead of the real one.
        #[arg(long)]
        mock: bool,

        /// Stop after this many finished episodes.
        #[arg(long)]
        episodes: Option<usize>,
    },

    /// Validate an interface descriptor file.
    Validate {
        /// Path to the interface JSON file.
        path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<ConnectorConfig>(&text)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        }
        None => ConnectorConfig::default(),
    };
    config.platform.fill_from_env();
    config.verbose |= cli.verbose;

    // Reads RUST_LOG, defaults to info (debug with --verbose).
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            interface,
            retry,
            mock,
            episodes,
        } => {
            let retry = retry || config.retry;
            let interface = match interface {
                Some(path) => read_json(&path)?,
                None => PointMass::interface(),
            };
            let runner = SimRunner::new().with_max_episodes(episodes);
            if mock {
                tracing::info!("Using scripted platform");
                cmd_run(ScriptedPlatform::demo(3, 20), &interface, retry, runner).await
            } else {
                let client = HttpPlatformClient::new(&config.platform)
                    .context("Failed to set up the platform client")?;
                cmd_run(client, &interface, retry, runner).await
            }
        }
        Commands::Validate { path } => cmd_validate(&path),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run<C: PlatformClient>(
    client: C,
    interface: &Value,
    retry: bool,
    runner: SimRunner,
) -> Result<()> {
    tracing::info!(workspace = client.workspace(), retry, "Connecting simulator");

    let summary: RunSummary = SessionAdapter::scoped(client, interface, retry, move |adapter| {
        Box::pin(async move {
            let mut sim = PointMass::new();
            let ctrl_c = async {
                // A failing signal handler just means we never interrupt.
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            runner.run_until(adapter, &mut sim, ctrl_c).await
        })
    })
    .await?;

    tracing::info!(
        episodes = summary.episodes_finished,
        steps = summary.steps,
        registrations = summary.registrations,
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let descriptor = read_json(path)?;
    let interface = validate_interface(&descriptor)
        .with_context(|| format!("Invalid interface in {}", path.display()))?;

    println!("Interface: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&interface)?);
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
