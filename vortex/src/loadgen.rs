//! vortex-loadgen - load generator for a Vortex collector
//!
//! Simulates many users, each with its own identity and session, emitting a
//! `start_app` event, a run of random actions and a `close_app` event.
//! Actions are posted one by one to `/track`, or in chunks to `/batch`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use vortex_core::config::LoggingConfig;
use vortex_core::{
    Batch, Event, HttpTransport, MemoryIdentityStore, SessionState, TrackerConfig, Transport,
};

#[derive(Parser, Debug)]
#[command(name = "vortex-loadgen")]
#[command(about = "Generate synthetic tracking load against a Vortex collector")]
#[command(version)]
struct Args {
    /// Collector base URL
    #[arg(long, default_value = "http://localhost:9876")]
    base_url: String,

    /// Tenant the events are scoped to (repeat for several)
    #[arg(long = "tenant", default_value = "alpha")]
    tenants: Vec<String>,

    /// Number of simulated users
    #[arg(long, default_value_t = 500)]
    users: usize,

    /// Actions emitted per user, between start_app and close_app
    #[arg(long, default_value_t = 50)]
    events_per_user: usize,

    /// Users in flight at once
    #[arg(long, default_value_t = 50)]
    concurrency: usize,

    /// Post actions to /batch instead of /track
    #[arg(long)]
    batch: bool,

    /// Events per /batch request
    #[arg(long, default_value_t = 15)]
    batch_size: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Verbose output (logs to stderr)
    #[arg(short, long)]
    verbose: bool,
}

const PLATFORMS: &[&str] = &["Windows", "macOS", "Linux"];
const REPORT_TYPES: &[&str] = &["profit_loss", "balance_sheet", "cash_flow"];
const DATA_TYPES: &[&str] = &["transactions", "clients", "invoices"];
const SETTINGS: &[&str] = &["currency", "tax_rate"];
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CAD"];
const COMPANIES: &[&str] = &["Acme Corp", "Globex", "Initech", "Umbrella", "Hooli"];

/// Action names a simulated user picks from
const ACTIONS: &[&str] = &[
    "open_invoice",
    "create_invoice",
    "edit_invoice",
    "delete_invoice",
    "record_payment",
    "generate_report",
    "export_csv",
    "add_client",
    "edit_client",
    "delete_client",
    "login",
    "logout",
    "change_settings",
    "backup_data",
    "restore_data",
];

fn pick_from<'a>(items: &[&'a str]) -> &'a str {
    items.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

fn invoice_id() -> String {
    format!("INV-{}", rand::thread_rng().gen_range(1..=9999))
}

fn client_id() -> String {
    format!("C{}", rand::thread_rng().gen_range(1..=9999))
}

fn user_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("user_{}", suffix.to_lowercase())
}

fn app_version() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}.{}.{}",
        rng.gen_range(0..5),
        rng.gen_range(0..20),
        rng.gen_range(0..50)
    )
}

/// Properties for an action, shaped like the real client's
fn action_value(action: &str) -> Value {
    match action {
        "open_invoice" | "edit_invoice" | "delete_invoice" => json!({ "invoice_id": invoice_id() }),
        "create_invoice" | "edit_client" | "delete_client" => json!({ "client_id": client_id() }),
        "record_payment" => json!({
            "invoice_id": invoice_id(),
            "amount": rand::thread_rng().gen_range(1_000..=100_000) as f64 / 100.0,
        }),
        "generate_report" => json!({
            "report_type": pick_from(REPORT_TYPES),
            "month": format!("2025-{}", rand::thread_rng().gen_range(1..=12)),
        }),
        "export_csv" => json!({ "data_type": pick_from(DATA_TYPES) }),
        "add_client" => json!({ "client_name": pick_from(COMPANIES) }),
        "login" | "logout" => json!({ "user": user_name() }),
        "change_settings" => json!({
            "setting": pick_from(SETTINGS),
            "new_value": pick_from(CURRENCIES),
        }),
        _ => json!({}),
    }
}

#[derive(Debug, Default)]
struct Totals {
    requests: AtomicUsize,
    events: AtomicUsize,
    failures: AtomicUsize,
}

impl Totals {
    fn record(&self, events: usize, result: vortex_core::Result<()>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(()) => {
                self.events.fetch_add(events, Ordering::Relaxed);
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Request failed");
            }
        }
    }
}

struct Simulation {
    transport: HttpTransport,
    args: Args,
    totals: Totals,
    progress: ProgressBar,
}

impl Simulation {
    async fn send_one(&self, event: &Event) {
        let result = self.transport.send_track(event).await;
        self.totals.record(1, result);
        self.progress.inc(1);
    }

    async fn send_chunk(&self, events: Vec<Event>) {
        let count = events.len();
        let result = self.transport.send_batch(&Batch::new(events)).await;
        self.totals.record(count, result);
        self.progress.inc(count as u64);
    }

    async fn simulate_user(&self) {
        let session = SessionState::initialize(
            self.args
                .tenants
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_default(),
            pick_from(PLATFORMS),
            app_version(),
            &MemoryIdentityStore::new(),
        );
        tracing::debug!(identity = %session.identity(), tenant = %session.tenant_id(), "Simulating user");

        self.send_one(&session.create_event("start_app", String::new()))
            .await;

        let mut buffer = Vec::with_capacity(self.args.batch_size);
        for _ in 0..self.args.events_per_user {
            let action = pick_from(ACTIONS);
            let event = session.create_event(action, action_value(action).to_string());

            if self.args.batch {
                buffer.push(event);
                if buffer.len() >= self.args.batch_size {
                    self.send_chunk(std::mem::take(&mut buffer)).await;
                }
            } else {
                self.send_one(&event).await;
            }
        }

        self.send_one(&session.create_event("close_app", String::new()))
            .await;

        if !buffer.is_empty() {
            self.send_chunk(buffer).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        vortex_core::logging::init_stderr(&LoggingConfig::default());
    }

    anyhow::ensure!(args.concurrency > 0, "--concurrency must be at least 1");
    anyhow::ensure!(args.batch_size > 0, "--batch-size must be at least 1");
    anyhow::ensure!(!args.tenants.is_empty(), "at least one --tenant is required");

    let mut config = TrackerConfig::new(args.tenants[0].clone(), args.base_url.clone());
    config.request_timeout_secs = args.timeout_secs;
    let transport = HttpTransport::new(&config).context("invalid collector settings")?;

    println!(
        "Starting load: {} users x {} events against {} ({})",
        args.users,
        args.events_per_user,
        transport.base_url(),
        if args.batch { "/batch" } else { "/track" }
    );

    let total_events = args.users * (args.events_per_user + 2);
    let progress = ProgressBar::new(total_events as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let users = args.users;
    let permits = Arc::new(Semaphore::new(args.concurrency));
    let simulation = Arc::new(Simulation {
        transport,
        args,
        totals: Totals::default(),
        progress,
    });

    let started = Instant::now();
    let mut workers = JoinSet::new();
    for _ in 0..users {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("concurrency limiter closed")?;
        let simulation = Arc::clone(&simulation);
        workers.spawn(async move {
            simulation.simulate_user().await;
            drop(permit);
        });
    }
    while let Some(joined) = workers.join_next().await {
        joined.context("simulated user panicked")?;
    }
    let elapsed = started.elapsed();

    simulation.progress.finish_and_clear();

    let totals = &simulation.totals;
    let delivered = totals.events.load(Ordering::Relaxed);
    println!("Load complete in {:.1}s", elapsed.as_secs_f64());
    println!();
    println!("  Requests:   {}", totals.requests.load(Ordering::Relaxed));
    println!("  Delivered:  {} / {} event(s)", delivered, total_events);
    println!("  Failures:   {}", totals.failures.load(Ordering::Relaxed));
    if elapsed.as_secs_f64() > 0.0 {
        println!(
            "  Throughput: {:.0} events/s",
            delivered as f64 / elapsed.as_secs_f64()
        );
    }

    Ok(())
}
