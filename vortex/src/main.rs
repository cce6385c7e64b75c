//! vortex - CLI tool for inspecting and exercising the Vortex tracker
//!
//! This tool provides commands for:
//! - Checking tracker configuration and readiness
//! - Probing the collector's health endpoint
//! - Recording a single event end to end
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/vortex/config.toml (~/.config/vortex/config.toml)
//! - Identity: $XDG_DATA_HOME/vortex/identity (~/.local/share/vortex/identity)
//! - Logs: $XDG_STATE_HOME/vortex/vortex.<date>.log (~/.local/state/vortex/)

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vortex_core::tracker::probe;
use vortex_core::{logging, Config, HttpTransport, Liveness, Payload, SyncTracker};

#[derive(Parser)]
#[command(name = "vortex")]
#[command(about = "Inspect and exercise the Vortex analytics tracker")]
#[command(version)]
struct Args {
    /// Verbose output (logs to stderr)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show tracker configuration and readiness
    Status,

    /// Run one health probe against the collector
    Probe,

    /// Record one event, then shut the tracker down with a final flush
    Track {
        /// Event name
        name: String,

        /// JSON payload, e.g. '{"level": 3}'
        #[arg(long, conflicts_with = "text")]
        value: Option<String>,

        /// Plain text payload, sent as {"data": "<text>"}
        #[arg(long)]
        text: Option<String>,

        /// Record into the manual batch instead of the event queue
        #[arg(long)]
        batched: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = if args.verbose {
        logging::init_stderr(&config.logging);
        None
    } else {
        Some(logging::init(&config.logging).context("failed to initialize logging")?)
    };

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Probe => cmd_probe(&config),
        Command::Track {
            name,
            value,
            text,
            batched,
        } => cmd_track(&config, name, value, text, batched),
    }
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("Vortex Tracker Configuration");
    println!("============================");
    println!();

    let tracker = &config.tracker;

    println!("Config File:     {}", Config::config_path().display());
    println!("Log Dir:         {}", logging::log_dir().display());
    println!("Enabled:         {}", tracker.enabled);

    if !tracker.enabled {
        println!();
        println!("Tracker is disabled. Enable it in config.toml:");
        println!();
        println!("  [tracker]");
        println!("  enabled = true");
        println!("  tenant_id = \"your-tenant\"");
        println!("  base_url = \"https://collector.example.com\"");
        return Ok(());
    }

    println!(
        "Tenant ID:       {}",
        tracker.tenant_id.as_deref().unwrap_or("<not set>")
    );
    println!(
        "Collector URL:   {}",
        tracker.base_url.as_deref().unwrap_or("<not set>")
    );
    println!("Platform:        {}", tracker.platform);
    println!("App Version:     {}", tracker.app_version);
    println!(
        "Batching:        {}",
        if tracker.auto_batching {
            format!("auto, every {}s", tracker.flush_interval_secs)
        } else {
            "immediate".to_string()
        }
    );
    println!("Probe Timeout:   {}s", tracker.probe_timeout_secs);
    println!("Drain Timeout:   {}ms", tracker.shutdown_timeout_ms);

    let identity_path = Config::identity_path();
    println!(
        "Identity:        {}{}",
        identity_path.display(),
        if identity_path.exists() {
            ""
        } else {
            " (created on first run)"
        }
    );

    println!();
    match tracker.validate() {
        Ok(()) => println!("Status: Ready to track"),
        Err(e) => println!("Status: Not ready ({})", e),
    }

    Ok(())
}

fn cmd_probe(config: &Config) -> Result<()> {
    if !config.tracker.is_ready() {
        println!("Tracker is not configured. Run 'status' for details.");
        return Ok(());
    }

    let transport = HttpTransport::new(&config.tracker).context("failed to create transport")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to create runtime")?;
    let liveness = runtime.block_on(probe(&transport, config.tracker.probe_timeout()));

    println!("Collector:       {}", transport.base_url());
    println!("Liveness:        {}", liveness);

    Ok(())
}

fn cmd_track(
    config: &Config,
    name: String,
    value: Option<String>,
    text: Option<String>,
    batched: bool,
) -> Result<()> {
    if !config.tracker.is_ready() {
        println!("Tracker is not configured. Run 'status' for details.");
        return Ok(());
    }

    let payload = match (value, text) {
        (Some(value), _) => {
            let json: serde_json::Value =
                serde_json::from_str(&value).context("--value must be valid JSON")?;
            Payload::Props(json)
        }
        (None, Some(text)) => Payload::Text(text),
        (None, None) => Payload::None,
    };

    let tracker = match SyncTracker::from_config(&config.tracker)
        .context("failed to start tracker")?
    {
        Some(tracker) => tracker,
        None => {
            println!("Tracker is disabled.");
            return Ok(());
        }
    };

    let liveness =
        tracker.wait_for_liveness(config.tracker.probe_timeout() + Duration::from_secs(1));
    tracing::debug!(%liveness, "Probe resolved");

    if batched {
        tracker.batched_track_event(name.as_str(), payload);
    } else {
        tracker.track_event(name.as_str(), payload);
        if liveness == Liveness::Alive
            && !config.tracker.auto_batching
            && !tracker.wait_for_sends(config.tracker.request_timeout())
        {
            tracing::warn!("Event still in flight at shutdown");
        }
    }

    let handle = tracker.tracker().clone();
    let final_flush = tracker.shutdown();
    let stats = handle.stats();

    println!("Event:           {}", name);
    println!("Session:         {}", handle.session().session_id());
    println!("Liveness:        {}", liveness);
    println!("Final Flush:     {} event(s)", final_flush);
    println!();
    println!("Stats:");
    println!("  Tracked:    {}", stats.events_tracked);
    println!("  Sent:       {}", stats.events_sent);
    println!("  Dropped:    {}", stats.events_dropped);
    println!("  Failures:   {}", stats.send_failures);

    Ok(())
}
