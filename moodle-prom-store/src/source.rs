use crate::rows::{CourseRow, EnrolmentRow, LogRow, ModuleRow, TaskRow, UserAuthRow};
use async_trait::async_trait;
use moodle_prom_core::ExporterError;
use moodle_prom_core::labels::SiteInfo;

/// Read-only query interface over a Moodle site.
///
/// Every method issues a single query. An empty result is `Ok(vec![])`,
/// never an error. `cutoff` is epoch seconds; only rows strictly newer
/// than it are counted.
#[async_trait]
pub trait MoodleSource: Send + Sync {
    /// Front-page short name plus `version` / `release` from the config table.
    async fn site_info(&self) -> Result<SiteInfo, ExporterError>;

    /// Users whose last access is after `cutoff`.
    async fn online_users(&self, cutoff: i64) -> Result<i64, ExporterError>;

    async fn user_counts(&self) -> Result<Vec<UserAuthRow>, ExporterError>;

    async fn course_counts(&self) -> Result<Vec<CourseRow>, ExporterError>;

    async fn enrolment_counts(&self) -> Result<Vec<EnrolmentRow>, ExporterError>;

    async fn module_counts(&self) -> Result<Vec<ModuleRow>, ExporterError>;

    /// Scheduled task runs that ended after `cutoff`.
    async fn task_counts(&self, cutoff: i64) -> Result<Vec<TaskRow>, ExporterError>;

    /// Standard log entries created after `cutoff`.
    async fn log_counts(&self, cutoff: i64) -> Result<Vec<LogRow>, ExporterError>;
}
