use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// How a scrape request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Ok,
    Forbidden,
    Error,
}

impl ScrapeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeOutcome::Ok => "ok",
            ScrapeOutcome::Forbidden => "forbidden",
            ScrapeOutcome::Error => "error",
        }
    }
}

/// The exporter's own scrape statistics.
///
/// When `enabled = false` no registry is created and recording is a no-op.
pub struct ScrapeStats {
    enabled: bool,
    registry: Option<Registry>,
    pub scrapes_total: Option<IntCounterVec>,
    pub scrape_duration: Option<Gauge>,
    pub scrape_records: Option<IntGauge>,
}

impl ScrapeStats {
    /// Create the stats holder. When `enabled = false`, everything is None.
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let registry = Registry::new();

        let scrapes_total = IntCounterVec::new(
            Opts::new("moodle_exporter_scrapes_total", "Scrape requests by outcome"),
            &["outcome"],
        )?;
        let scrape_duration = Gauge::new(
            "moodle_exporter_scrape_duration_seconds",
            "Duration of the last successful scrape",
        )?;
        let scrape_records = IntGauge::new(
            "moodle_exporter_scrape_records",
            "Records produced by the last successful scrape",
        )?;

        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(scrape_records.clone()))?;

        Ok(Self {
            enabled: true,
            registry: Some(registry),
            scrapes_total: Some(scrapes_total),
            scrape_duration: Some(scrape_duration),
            scrape_records: Some(scrape_records),
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            registry: None,
            scrapes_total: None,
            scrape_duration: None,
            scrape_records: None,
        }
    }

    /// Count a finished request (no-op when disabled).
    #[inline]
    pub fn record_outcome(&self, outcome: ScrapeOutcome) {
        if let Some(ref counter) = self.scrapes_total {
            counter.with_label_values(&[outcome.as_str()]).inc();
        }
    }

    /// Record a successful scrape (no-op when disabled).
    #[inline]
    pub fn record_success(&self, duration_secs: f64, records: usize) {
        self.record_outcome(ScrapeOutcome::Ok);
        if let Some(ref gauge) = self.scrape_duration {
            gauge.set(duration_secs);
        }
        if let Some(ref gauge) = self.scrape_records {
            gauge.set(records as i64);
        }
    }

    /// Render prometheus text exposition format.
    pub fn render(&self) -> String {
        match self.registry {
            Some(ref registry) => render_registry(registry),
            None => String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn render_registry(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode exporter self-metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
