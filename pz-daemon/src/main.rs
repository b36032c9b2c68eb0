//! pinzone daemon (pinzoned)
//!
//! Owns the GPIO lines for the irrigation relays and serves the control
//! socket used by the scheduler (zone changes) and the settings page.
//!
//! # Startup
//! 1. Load the pin configuration (a corrupt file is fatal)
//! 2. Request every enabled line, retrying a few times
//! 3. Serve the control socket until SIGINT/SIGTERM
//!
//! # Shutdown
//! All held lines are released on a helper thread with a bounded grace
//! period, whichever path ends the process.

mod cli;
mod server;

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use pz_core::constants::timing::INIT_RETRY_DELAY;
use pz_core::{Controller, GpioBackend, LineManager, ParamStore, PinMap, ShutdownOutcome};

use cli::Cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber: journald when available, stdout otherwise
fn init_logging() -> bool {
    let log_level = std::env::var("PINZONE_LOG").unwrap_or_else(|_| "info".to_string());

    if Path::new("/run/systemd/journal/socket").exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .init();
    false
}

fn check_privileges(cli: &Cli) {
    // SAFETY: geteuid is always safe - it just returns the effective user ID of the process.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 && cli.backend != pz_core::BackendKind::Memory {
        warn!("Not running as root (euid={}); line requests may be refused", euid);
    }
}

fn report_shutdown(outcome: ShutdownOutcome) {
    match outcome {
        ShutdownOutcome::Released(report) if report.is_clean() => {
            info!("SHUTDOWN: released {} line(s)", report.released.len());
        }
        ShutdownOutcome::Released(report) => {
            for (line, reason) in &report.failed {
                warn!("SHUTDOWN: GPIO{} not released: {}", line, reason);
            }
        }
        ShutdownOutcome::TimedOut => warn!("SHUTDOWN: gave up waiting for line release"),
        ShutdownOutcome::AlreadyFinalized => {}
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let use_journald = init_logging();

    info!("STARTUP: pinzoned {} starting", VERSION);
    info!("STARTUP: Logging to {}", if use_journald { "systemd journal" } else { "stdout" });
    check_privileges(&cli);

    // Umask for the data file and socket: group may read, others get nothing
    // SAFETY: umask is always safe to call - it simply sets the file creation mask for the process.
    unsafe { libc::umask(0o007) };

    let data_file = cli.data_file();
    let grace = cli.shutdown_grace();
    let backend = GpioBackend::from_config(&cli.backend_config());
    info!(
        "STARTUP: backend={}, data file {:?}, line offset {}",
        backend.kind(),
        data_file,
        cli.line_offset
    );

    let lines = LineManager::new(backend);
    let controller = Arc::new(Controller::new(
        lines,
        ParamStore::new(&data_file),
        PinMap::from_labels(cli.line_offset),
    ));

    // Signals: release lines within the grace period, remove the socket, exit
    {
        let controller = Arc::clone(&controller);
        let socket_path = cli.socket.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
            report_shutdown(controller.shutdown(grace));
            let _ = std::fs::remove_file(&socket_path);
            info!("SHUTDOWN: pinzoned terminated");
            std::process::exit(0);
        }) {
            warn!("Failed to set signal handler: {}. Lines may stay requested on exit.", e);
        }
    }

    if let Err(e) = controller.load() {
        error!("Could not load pin configuration from {:?}: {}", data_file, e);
        report_shutdown(controller.shutdown(grace));
        return Err(e).with_context(|| format!("loading {:?}", data_file));
    }

    let attempts = cli.init_retries.max(1);
    for attempt in 1..=attempts {
        match controller.init_lines() {
            Ok(()) => break,
            Err(e) if attempt < attempts => {
                warn!("Line init attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(INIT_RETRY_DELAY).await;
            }
            Err(e) => {
                // Keep serving; settings updates or a reinit request can still fix this
                error!("Line init failed after {} attempt(s): {}", attempts, e);
            }
        }
    }

    // The signal handler ends the process; the server only returns on error
    let result =
        server::run_server(&cli.socket, Arc::clone(&controller), std::future::pending()).await;

    report_shutdown(controller.shutdown(grace));

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Do not wait on blocked zone_change handlers when the runtime drops
    std::process::exit(0);
}
