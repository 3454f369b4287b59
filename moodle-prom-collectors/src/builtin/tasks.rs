use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::TaskRow;

/// Scheduled task runs and failures completed inside the window.
pub struct TasksCollector;

fn task_labels(row: &TaskRow) -> Labels {
    Labels::new()
        .with("component", row.component.as_str())
        .with("classname", row.classname.as_str())
}

#[async_trait]
impl Collector for TasksCollector {
    fn name(&self) -> &str {
        "tasks"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.tasks
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let rows = ctx.source.task_counts(ctx.cutoff).await?;
        let mut records = Vec::with_capacity(rows.len() * 2);

        for row in &rows {
            let labels = ctx.labels(task_labels(row));
            records.push(MetricRecord::gauge(
                "moodle_task_runs",
                row.runs,
                labels.clone(),
                "Scheduled task runs",
            ));
            records.push(MetricRecord::gauge(
                "moodle_task_failures",
                row.failures,
                labels,
                "Scheduled task failures",
            ));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodle_prom_store::MemorySource;
    use moodle_prom_core::MetricValue;

    #[tokio::test]
    async fn windowed_by_cutoff() {
        let source = MemorySource {
            tasks: vec![TaskRow {
                component: "core".into(),
                classname: r"\core\task\send_emails".into(),
                runs: 2,
                failures: 1,
            }],
            ..Default::default()
        };
        let defaults = Labels::new();
        let ctx = CollectContext {
            source: &source,
            default_labels: &defaults,
            cutoff: 1_650_000_000,
        };

        let records = TasksCollector.collect(&ctx).await.unwrap();
        assert_eq!(source.log.cutoffs(), vec![1_650_000_000]);
        assert_eq!(records[0].name, "moodle_task_runs");
        assert_eq!(records[1].value, MetricValue::Int(1));
        assert_eq!(
            records[0].labels.get("classname"),
            Some(r"\core\task\send_emails")
        );
    }
}
