use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::UserAuthRow;

/// Online users inside the window, plus account states per auth plugin.
pub struct UsersCollector;

fn auth_labels(row: &UserAuthRow) -> Labels {
    Labels::new().with("auth", row.auth.as_str())
}

#[async_trait]
impl Collector for UsersCollector {
    fn name(&self) -> &str {
        "users"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.users
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let online = ctx.source.online_users(ctx.cutoff).await?;
        let rows = ctx.source.user_counts().await?;

        let mut records = Vec::with_capacity(1 + rows.len() * 3);
        records.push(MetricRecord::gauge(
            "moodle_users_online",
            online,
            ctx.default_labels.clone(),
            "Users online",
        ));

        for row in &rows {
            let labels = ctx.labels(auth_labels(row));
            records.push(MetricRecord::gauge(
                "moodle_users_active",
                row.active,
                labels.clone(),
                "Active users",
            ));
            records.push(MetricRecord::gauge(
                "moodle_users_deleted",
                row.deleted,
                labels.clone(),
                "Deleted users",
            ));
            records.push(MetricRecord::gauge(
                "moodle_users_suspended",
                row.suspended,
                labels,
                "Suspended users",
            ));
        }

        Ok(records)
    }
}
