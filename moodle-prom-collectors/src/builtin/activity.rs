use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::LogRow;

/// Standard log entries created inside the window.
pub struct ActivityCollector;

fn log_labels(row: &LogRow) -> Labels {
    Labels::new()
        .with("component", row.component.as_str())
        .with("crud", row.crud.as_str())
        .with("edulevel", row.edulevel.to_string())
        .with("origin", row.origin.as_str())
}

#[async_trait]
impl Collector for ActivityCollector {
    fn name(&self) -> &str {
        "activity"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.activity
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let rows = ctx.source.log_counts(ctx.cutoff).await?;

        Ok(rows
            .iter()
            .map(|row| {
                MetricRecord::gauge(
                    "moodle_log_items",
                    row.items,
                    ctx.labels(log_labels(row)),
                    "Log entries",
                )
            })
            .collect())
    }
}
