//! cachelimitd entry point.
//!
//! Parses CLI arguments, loads and validates the TOML config, runs the
//! initializer, and parks the main thread until a shutdown signal. The
//! workload checkpoint, HTTP admission endpoint, and orchestrator
//! discovery are external collaborators this binary does not implement.

use anyhow::{Context, Result};
use cachelimitd::checkpoint::Checkpoint;
use cachelimitd::config;
use cachelimitd::initializer;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cachelimitd", version, about = "Node-local LLC/MB cache isolation agent")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CACHELIMITD_CONFIG")]
    config: PathBuf,
}

static SHUTDOWN_SIGNALS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    SHUTDOWN_SIGNALS.fetch_add(1, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, handle_shutdown_signal as usize);
        libc::signal(libc::SIGINT, handle_shutdown_signal as usize);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "cachelimitd failed to start");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing::info!(config = %cli.config.display(), "loading configuration");
    let cfg = config::toml::load(&cli.config).context("loading configuration")?;

    // Workload discovery is out of scope; the checkpoint starts empty and
    // is populated by an external collaborator this process does not run.
    let checkpoint = Arc::new(Checkpoint::new());

    let agent = initializer::initialize(&cfg, checkpoint).context("initializing cache-limit agent")?;
    tracing::info!("cache-limit agent initialized, enabled = {}", agent.enabled());

    install_signal_handlers();
    while SHUTDOWN_SIGNALS.load(Ordering::SeqCst) == 0 {
        std::thread::sleep(Duration::from_millis(200));
    }

    tracing::info!("shutdown signal received, draining controller");
    agent.shutdown();
    Ok(())
}
