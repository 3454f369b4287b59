use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::ModuleRow;

pub struct ModulesCollector;

fn module_labels(row: &ModuleRow) -> Labels {
    Labels::new().with("module", row.name.as_str())
}

#[async_trait]
impl Collector for ModulesCollector {
    fn name(&self) -> &str {
        "modules"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.modules
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let rows = ctx.source.module_counts().await?;
        let mut records = Vec::with_capacity(rows.len() * 2);

        for row in &rows {
            let labels = ctx.labels(module_labels(row));
            records.push(MetricRecord::gauge(
                "moodle_modules_visible",
                row.visible,
                labels.clone(),
                "Visible course modules",
            ));
            records.push(MetricRecord::gauge(
                "moodle_modules_hidden",
                row.hidden,
                labels,
                "Hidden course modules",
            ));
        }

        Ok(records)
    }
}
