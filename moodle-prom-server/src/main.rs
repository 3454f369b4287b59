#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use moodle_prom_collectors::{CollectorRegistry, Scraper};
use moodle_prom_core::ExporterConfig;
use moodle_prom_core::config::LogFormat;
use moodle_prom_http::{AppState, MetricsServer};
use moodle_prom_observability::ScrapeStats;
use moodle_prom_store::SqlSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moodle-prom", version, about = "Prometheus exporter for Moodle")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/moodle-prom/exporter.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let (config, from_file) = if cli.config.exists() {
        (ExporterConfig::load(&cli.config)?, true)
    } else {
        let config = ExporterConfig::default();
        config.validate()?;
        (config, false)
    };

    // ── Tracing ──
    init_tracing(config.observability.log_format, &cli.log_level);

    if from_file {
        info!(path = %cli.config.display(), "Loaded config file");
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }

    if cli.check_config {
        info!("Configuration is valid");
        return Ok(());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "moodle-prom starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    // ── Data source ──
    let source = SqlSource::connect(&config.database).await?;

    // ── Collectors ──
    let mut registry = CollectorRegistry::new();
    moodle_prom_collectors::register_all(&mut registry);
    let scraper = Scraper::new(Arc::new(registry), Arc::new(source), &config);
    info!(collectors = ?scraper.enabled_collectors(), "Collectors enabled");

    // ── Self-metrics ──
    let stats = ScrapeStats::new(config.observability.self_metrics.enabled)?;

    // ── HTTP ──
    let state = AppState::new(&config, scraper, stats);
    MetricsServer::new(config.server.addr.clone(), state)
        .start(shutdown_signal())
        .await
}

fn init_tracing(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
