use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::MoodleSource;

/// Read-only inputs shared by every collector during one scrape.
pub struct CollectContext<'a> {
    pub source: &'a dyn MoodleSource,
    /// Merged under each row's own labels; row labels win on collision.
    pub default_labels: &'a Labels,
    /// Epoch seconds; time-windowed queries count rows newer than this.
    pub cutoff: i64,
}

impl CollectContext<'_> {
    /// Default labels overlaid with a row's grouping labels.
    pub fn labels(&self, row: Labels) -> Labels {
        self.default_labels.merged(&row)
    }
}

/// A producer of metric records for one data domain.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Collector name (must be unique)
    fn name(&self) -> &str;

    /// Whether configuration switches this collector on.
    fn enabled(&self, toggles: &CollectorToggles) -> bool;

    /// Query the source and map each row to records. An empty result is
    /// zero records; a failed query fails the whole scrape.
    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError>;
}
