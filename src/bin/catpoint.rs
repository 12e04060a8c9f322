//! Catpoint - home security controller
//!
//! Runs the alarm engine over the persisted sensor state and either opens
//! the interactive console or executes a single command.
//!
//! # Usage
//!
//! ```bash
//! # Interactive console
//! catpoint
//!
//! # One-shot commands
//! catpoint add-sensor door Front door
//! catpoint arm away
//! catpoint activate "Front door"
//! catpoint image ./frame.jpg
//!
//! # Custom state file
//! CATPOINT_STORE=/var/lib/catpoint/state.json catpoint status
//!
//! # Enable debug logging
//! RUST_LOG=catpointd=debug,catpoint_core=debug catpoint
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: leave the console after the current command

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catpointd::classifier::{CommandClassifier, DisabledClassifier};
use catpointd::config::Config;
use catpointd::console::{self, ConsoleCommand, Reply};
use catpointd::display::Renderer;
use catpointd::engine::{spawn_engine, ClassifierPolicy, SharedClassifier};
use catpointd::store::JsonFileStore;

/// Catpoint home security controller
#[derive(Parser, Debug)]
#[command(name = "catpoint", version, about)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/catpoint/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// State file, overriding the config and CATPOINT_STORE
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Command to run; opens the console when omitted
    #[command(subcommand)]
    command: Option<ConsoleCommand>,
}

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "catpoint=info,catpointd=info,catpoint_core=info";

/// `RUST_LOG` when it parses, otherwise the default filter.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args));
    // Stdin reads park a blocking thread that never returns on its own.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(store_path) = args.store {
        config.store_path = store_path;
    }

    let store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("Failed to open state file {}", config.store_path.display()))?;

    let classifier: SharedClassifier = match &config.classifier.command {
        Some(command) => Arc::new(
            CommandClassifier::new(command, config.classifier.args.clone())
                .with_timeout(config.classifier.timeout()),
        ),
        None => Arc::new(DisabledClassifier),
    };
    let policy = ClassifierPolicy {
        timeout: config.classifier.timeout(),
        assume_no_cat_on_failure: config.classifier.assume_no_cat_on_failure,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store_path.display(),
        classifier = config.classifier.command.as_deref().unwrap_or("disabled"),
        "Catpoint starting"
    );

    let handle = spawn_engine(store, classifier, policy);
    let renderer = Renderer::new(!args.no_color && std::io::stdout().is_terminal());

    match args.command {
        Some(command) => match console::execute(&handle, &renderer, command).await? {
            Reply::Output(text) => println!("{text}"),
            Reply::Quit => {}
        },
        None => {
            let cancel_token = CancellationToken::new();
            let shutdown_token = cancel_token.clone();
            tokio::spawn(async move {
                if let Err(e) = wait_for_shutdown_signal().await {
                    error!(error = %e, "Error waiting for shutdown signal");
                }
                info!("Shutdown signal received");
                shutdown_token.cancel();
            });

            console::run_console(handle, renderer, cancel_token)
                .await
                .context("Console I/O failed")?;
        }
    }

    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
