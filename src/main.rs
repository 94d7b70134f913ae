//! cellmediatord: host daemon for the cellular radio power mediator.
//!
//! Reads one JSON object per line from stdin and feeds it to the worker:
//!
//! ```text
//! {"signal":"boot_completed","proxy_connected":true}
//! {"signal":"user_unlocked"}
//! {"signal":"proxy_connected_changed","connected":false}
//! {"control":"sleep","ms":500}
//! {"control":"dump"}
//! ```
//!
//! `signal` lines are [`Signal`]s.  `control` lines drive the daemon
//! itself: `dump` prints the mediator dump, `sleep` pauses the feed so
//! timers can fire, and `service_state` reports a modem service state when
//! the simulated modem is not echoing confirmations.  The final dump is
//! printed at end of input.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use cellmediator::adapters::confirm::{ServiceState, ServiceStateMonitor, confirmation_channel};
use cellmediator::adapters::hardware::SimulatedModem;
use cellmediator::app::commands::Signal;
use cellmediator::app::worker::{MediatorHandle, MediatorWorker};
use cellmediator::config::MediatorConfig;

#[derive(Parser, Debug)]
#[command(name = "cellmediatord", about = "Cellular radio power mediator (host)")]
struct Cli {
    /// JSON configuration file.  Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not confirm radio toggles automatically; every toggle waits for a
    /// `service_state` control line or the configured timeout.
    #[arg(long)]
    no_echo: bool,

    /// Print the final state as a JSON snapshot instead of the text dump.
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedLine {
    Signal(Signal),
    Control(Control),
}

#[derive(Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
enum Control {
    Dump,
    Sleep { ms: u64 },
    ServiceState { state: ServiceState },
}

fn main() -> Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Config ──────────────────────────────────────────────────
    let config = load_config(cli.config.as_deref())?;
    info!(
        "cellmediatord starting (linger={}ms, delay={}ms, wait={}ms)",
        config.cell_linger_duration_ms, config.cell_delay_ms, config.radio_power_wait_ms
    );

    // ── Worker ──────────────────────────────────────────────────
    let (monitor, waiter) = confirmation_channel();
    let monitor = Arc::new(monitor);
    let modem = if cli.no_echo {
        SimulatedModem::new()
    } else {
        SimulatedModem::confirming(Arc::clone(&monitor))
    };
    let worker = MediatorWorker::spawn(config, modem, waiter).context("starting worker")?;
    let handle = worker.handle();

    // ── Feed ────────────────────────────────────────────────────
    feed(io::stdin().lock(), &handle, &monitor)?;

    if cli.json {
        let snapshot = handle.snapshot().context("querying snapshot")?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", handle.dump().context("querying dump")?);
    }

    worker.shutdown().context("stopping worker")?;
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<MediatorConfig> {
    let Some(path) = path else {
        return Ok(MediatorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: MediatorConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn feed(input: impl BufRead, handle: &MediatorHandle, monitor: &ServiceStateMonitor) -> Result<()> {
    for (lineno, line) in input.lines().enumerate() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: FeedLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("line {}: ignoring unparseable input: {}", lineno + 1, e);
                continue;
            }
        };
        match parsed {
            FeedLine::Signal(signal) => handle.send(signal)?,
            FeedLine::Control(Control::Dump) => print!("{}", handle.dump()?),
            FeedLine::Control(Control::Sleep { ms }) => std::thread::sleep(Duration::from_millis(ms)),
            FeedLine::Control(Control::ServiceState { state }) => {
                monitor.on_service_state_changed(state);
            }
        }
    }
    Ok(())
}
