//! In-memory source, used for tests and dry runs.

use crate::rows::{CourseRow, EnrolmentRow, LogRow, ModuleRow, TaskRow, UserAuthRow};
use crate::source::MoodleSource;
use async_trait::async_trait;
use moodle_prom_core::ExporterError;
use moodle_prom_core::labels::SiteInfo;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed rows served from memory.
///
/// Rows are returned as stored; window filtering is the caller's concern
/// and every cutoff passed in is recorded for inspection.
#[derive(Debug, Default)]
pub struct MemorySource {
    pub site: SiteInfo,
    pub online: i64,
    pub users: Vec<UserAuthRow>,
    pub courses: Vec<CourseRow>,
    pub enrolments: Vec<EnrolmentRow>,
    pub modules: Vec<ModuleRow>,
    pub tasks: Vec<TaskRow>,
    pub logs: Vec<LogRow>,
    /// Fail every query with a store error.
    pub failing: bool,
    pub log: QueryLog,
}

/// What a [`MemorySource`] was asked for.
#[derive(Debug, Default)]
pub struct QueryLog {
    queries: AtomicUsize,
    site_queries: AtomicUsize,
    cutoffs: Mutex<Vec<i64>>,
}

impl QueryLog {
    /// Total queries served, site info included.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn site_queries(&self) -> usize {
        self.site_queries.load(Ordering::SeqCst)
    }

    /// Cutoffs received by windowed queries, in call order.
    pub fn cutoffs(&self) -> Vec<i64> {
        self.cutoffs.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit(&self) -> Result<(), ExporterError> {
        self.log.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ExporterError::StoreError("memory source set to fail".into()));
        }
        Ok(())
    }

    fn hit_since(&self, cutoff: i64) -> Result<(), ExporterError> {
        if let Ok(mut cutoffs) = self.log.cutoffs.lock() {
            cutoffs.push(cutoff);
        }
        self.hit()
    }
}

#[async_trait]
impl MoodleSource for MemorySource {
    async fn site_info(&self) -> Result<SiteInfo, ExporterError> {
        self.log.site_queries.fetch_add(1, Ordering::SeqCst);
        self.hit()?;
        Ok(self.site.clone())
    }

    async fn online_users(&self, cutoff: i64) -> Result<i64, ExporterError> {
        self.hit_since(cutoff)?;
        Ok(self.online)
    }

    async fn user_counts(&self) -> Result<Vec<UserAuthRow>, ExporterError> {
        self.hit()?;
        Ok(self.users.clone())
    }

    async fn course_counts(&self) -> Result<Vec<CourseRow>, ExporterError> {
        self.hit()?;
        Ok(self.courses.clone())
    }

    async fn enrolment_counts(&self) -> Result<Vec<EnrolmentRow>, ExporterError> {
        self.hit()?;
        Ok(self.enrolments.clone())
    }

    async fn module_counts(&self) -> Result<Vec<ModuleRow>, ExporterError> {
        self.hit()?;
        Ok(self.modules.clone())
    }

    async fn task_counts(&self, cutoff: i64) -> Result<Vec<TaskRow>, ExporterError> {
        self.hit_since(cutoff)?;
        Ok(self.tasks.clone())
    }

    async fn log_counts(&self, cutoff: i64) -> Result<Vec<LogRow>, ExporterError> {
        self.hit_since(cutoff)?;
        Ok(self.logs.clone())
    }
}
