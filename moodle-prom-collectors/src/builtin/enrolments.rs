use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::EnrolmentRow;

/// Enrolment method instances and user enrolments per method.
pub struct EnrolmentsCollector;

fn enrol_labels(row: &EnrolmentRow) -> Labels {
    Labels::new().with("enrol", row.enrol.as_str())
}

#[async_trait]
impl Collector for EnrolmentsCollector {
    fn name(&self) -> &str {
        "enrolments"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.enrolments
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let rows = ctx.source.enrolment_counts().await?;
        let mut records = Vec::with_capacity(rows.len() * 4);

        for row in &rows {
            let labels = ctx.labels(enrol_labels(row));
            records.push(MetricRecord::gauge(
                "moodle_enrolments_enabled",
                row.enabled,
                labels.clone(),
                "Enabled enrolment method instances",
            ));
            records.push(MetricRecord::gauge(
                "moodle_enrolments_disabled",
                row.disabled,
                labels.clone(),
                "Disabled enrolment method instances",
            ));
            records.push(MetricRecord::gauge(
                "moodle_enrolments_active",
                row.active,
                labels.clone(),
                "Active user enrolments",
            ));
            records.push(MetricRecord::gauge(
                "moodle_enrolments_suspended",
                row.suspended,
                labels,
                "Suspended user enrolments",
            ));
        }

        Ok(records)
    }
}
