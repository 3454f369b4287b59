use crate::handlers;
use moodle_prom_collectors::Scraper;
use moodle_prom_core::ExporterConfig;
use moodle_prom_core::config::HEALTH_PATH;
use moodle_prom_observability::ScrapeStats;
use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub scraper: Scraper,
    pub stats: ScrapeStats,
    /// Configured shared secret; `None` disables token auth.
    pub token: Option<String>,
    pub default_timeframe: i64,
    pub metrics_path: String,
    /// Present when exporter self-metrics are served.
    pub self_metrics_path: Option<String>,
}

impl AppState {
    pub fn new(config: &ExporterConfig, scraper: Scraper, stats: ScrapeStats) -> Self {
        let self_metrics = &config.observability.self_metrics;
        Self {
            scraper,
            stats,
            token: config.auth.secret().map(str::to_string),
            default_timeframe: config.scrape.default_timeframe_secs,
            metrics_path: config.server.metrics_path.clone(),
            self_metrics_path: self_metrics.enabled.then(|| self_metrics.path.clone()),
        }
    }
}

/// Build the axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route(&state.metrics_path, get(handlers::metrics::scrape))
        .route(HEALTH_PATH, get(handlers::health::health_check));

    if let Some(path) = state.self_metrics_path.as_deref() {
        app = app.route(path, get(handlers::metrics::self_metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// The exporter's HTTP listener.
pub struct MetricsServer {
    addr: String,
    state: Arc<AppState>,
}

impl MetricsServer {
    pub fn new(addr: impl Into<String>, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::new(state),
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            metrics_path = %self.state.metrics_path,
            collectors = ?self.state.scraper.enabled_collectors(),
            "Starting metrics server"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}
