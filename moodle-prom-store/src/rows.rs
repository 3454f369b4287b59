//! Typed result rows, one per collector query.
//!
//! Counts are `i64` because every backend returns `COUNT(...)` as a
//! 64-bit integer.

use serde::Serialize;

/// Users per authentication plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAuthRow {
    pub auth: String,
    pub active: i64,
    pub deleted: i64,
    pub suspended: i64,
}

/// Courses per (format, theme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRow {
    pub format: String,
    pub theme: String,
    pub visible: i64,
    pub hidden: i64,
}

/// Enrolment instances and user enrolments per enrolment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrolmentRow {
    pub enrol: String,
    /// Enabled enrolment instances.
    pub enabled: i64,
    /// Disabled enrolment instances.
    pub disabled: i64,
    /// Active user enrolments across all instances of the method.
    pub active: i64,
    /// Suspended user enrolments across all instances of the method.
    pub suspended: i64,
}

/// Course modules per activity module, excluding pending deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRow {
    pub name: String,
    pub visible: i64,
    pub hidden: i64,
}

/// Scheduled task runs inside the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub component: String,
    pub classname: String,
    pub runs: i64,
    pub failures: i64,
}

/// Standard log entries inside the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    pub component: String,
    pub crud: String,
    pub edulevel: i64,
    pub origin: String,
    pub items: i64,
}
