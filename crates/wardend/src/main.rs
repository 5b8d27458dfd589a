//! wardend - The warden background service
//!
//! This is the main entry point for the wardend service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Resource controller and notifier adapters
//! - Core (ingestion, confirmation, enforcement scheduler)
//! - HTTP server for confirmation links and event ingestion

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warden_adapters::{CommandController, notifier_from_config};
use warden_api::TickSummary;
use warden_config::load_config;
use warden_core::{CloudTrailClassifier, WardenCore};
use warden_http::AppState;
use warden_store::{AuditEvent, AuditEventType, LifecycleStore, SqliteStore};
use warden_util::{Clock, DATABASE_FILENAME, SystemClock, default_config_path, format_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// wardend - confirm-or-stop governance for newly created cloud resources
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Confirm-or-stop governance for newly created cloud resources", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/warden/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set WARDEN_DATA_DIR env var)
    #[arg(short, long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP listen address override
    #[arg(long)]
    listen: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Run a single enforcement tick, print its summary and exit
    #[arg(long)]
    once: bool,
}

/// Main service state
struct Service {
    core: Arc<WardenCore>,
    store: Arc<dyn LifecycleStore>,
    clock: Arc<dyn Clock>,
    listen_addr: String,
    tick_interval: Duration,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            controller_types = policy.controller.commands.len(),
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn LifecycleStore> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        if warden_util::is_mock_time_active() {
            warn!(now = %clock.now(), "Mock time is active");
        }

        let controller = Arc::new(CommandController::new(policy.controller.clone()));
        let notifier = notifier_from_config(&policy.notifier).context("Failed to create notifier")?;

        let core = Arc::new(WardenCore::new(&policy, store.clone(), controller, notifier));

        let listen_addr = args
            .listen
            .clone()
            .unwrap_or_else(|| policy.service.listen_addr.clone());

        Ok(Self {
            core,
            store,
            clock,
            listen_addr,
            tick_interval: policy.service.tick_interval,
        })
    }

    /// Single tick for cron-style triggers. A store failure during the scan
    /// is an error so the caller exits non-zero.
    async fn run_once(&self) -> Result<TickSummary> {
        let now = self.clock.now();
        self.core
            .scheduler
            .tick(now)
            .await
            .context("Enforcement tick failed")
    }

    async fn run(self) -> Result<()> {
        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(self.clock.now(), AuditEventType::ServiceStarted))
        {
            warn!(error = %e, "Failed to log service start");
        }

        // Start HTTP server
        let listener = tokio::net::TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen_addr))?;

        let state = AppState::new(
            self.core.clone(),
            self.clock.clone(),
            Arc::new(CloudTrailClassifier::new()),
        );
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(warden_http::serve(listener, state, async move {
            let _ = shutdown_rx.await;
        }));

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        // Main loop
        let mut tick_timer = tokio::time::interval(self.tick_interval);
        tick_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            tick_interval = %format_duration(self.tick_interval),
            "Service running"
        );

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Enforcement tick; a failed scan is retried on the next one
                _ = tick_timer.tick() => {
                    if let Err(e) = self.core.scheduler.tick(self.clock.now()).await {
                        error!(error = %e, "Enforcement tick failed");
                    }
                }
            }
        }

        info!("Shutting down wardend");

        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "HTTP server error"),
            Err(e) => warn!(error = %e, "HTTP server task failed"),
        }

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(self.clock.now(), AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "wardend starting"
    );

    let service = Service::new(&args)?;

    if args.once {
        let summary = service.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    service.run().await
}
