//! SQL implementation of [`MoodleSource`] over the sqlx Any driver.
//!
//! One code path serves PostgreSQL, MySQL/MariaDB and SQLite. Counting is
//! done with conditional aggregation (`COUNT(CASE ...)`) so every count
//! column is a 64-bit integer on every backend.

use crate::rows::{CourseRow, EnrolmentRow, LogRow, ModuleRow, TaskRow, UserAuthRow};
use crate::source::MoodleSource;
use async_trait::async_trait;
use moodle_prom_core::ExporterError;
use moodle_prom_core::config::DatabaseConfig;
use moodle_prom_core::labels::SiteInfo;
use sqlx::any::{AnyPoolOptions, AnyRow, install_default_drivers};
use sqlx::{AnyPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Moodle's front-page course id.
const SITE_COURSE_ID: i64 = 1;

/// SQL differences between the supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Dialect::Postgres
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Dialect::MySql
        } else {
            Dialect::Sqlite
        }
    }

    /// Placeholder for the `n`th (1-based) parameter.
    pub fn param(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// `col` as a 64-bit integer. The Any driver cannot decode MySQL
    /// `TINYINT` or Postgres `SMALLINT` columns as `i64` directly.
    pub fn int_expr(&self, col: &str) -> String {
        match self {
            Dialect::Postgres => format!("CAST({col} AS BIGINT)"),
            Dialect::MySql => format!("CAST({col} AS SIGNED)"),
            Dialect::Sqlite => col.to_string(),
        }
    }

    /// `col` as character data, at most 255 characters on MySQL. `LONGTEXT`
    /// reaches the Any driver as a blob, and an unsized `CHAR` cast keeps the
    /// long type.
    pub fn text_expr(&self, col: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({col} AS CHAR(255))"),
            Dialect::Postgres | Dialect::Sqlite => col.to_string(),
        }
    }
}

/// Connection pool plus the table prefix of the site.
#[derive(Debug, Clone)]
pub struct SqlSource {
    pool: AnyPool,
    prefix: String,
    dialect: Dialect,
}

impl SqlSource {
    /// Open a pool against the configured database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ExporterError> {
        if config.url.is_empty() {
            return Err(ExporterError::ConfigError("database.url is not set".into()));
        }
        install_default_drivers();

        info!(url = %sanitize_url(&config.url), "Connecting to Moodle database");

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                warn!(error = %e, url = %sanitize_url(&config.url), "Database connection failed");
                store_err(e)
            })?;

        Ok(Self::from_pool(
            pool,
            &config.table_prefix,
            Dialect::from_url(&config.url),
        ))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: AnyPool, prefix: &str, dialect: Dialect) -> Self {
        Self {
            pool,
            prefix: prefix.to_string(),
            dialect,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    async fn fetch_all(&self, query: &'static str, sql: &str) -> Result<Vec<AnyRow>, ExporterError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        debug!(query, rows = rows.len(), "Query complete");
        Ok(rows)
    }

    async fn fetch_all_since(
        &self,
        query: &'static str,
        sql: &str,
        cutoff: i64,
    ) -> Result<Vec<AnyRow>, ExporterError> {
        let rows = sqlx::query(sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        debug!(query, cutoff, rows = rows.len(), "Query complete");
        Ok(rows)
    }
}

#[async_trait]
impl MoodleSource for SqlSource {
    async fn site_info(&self) -> Result<SiteInfo, ExporterError> {
        let mut site = SiteInfo::default();

        let sql = format!(
            "SELECT shortname FROM {} WHERE id = {}",
            self.table("course"),
            SITE_COURSE_ID
        );
        if let Some(row) = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
        {
            site.shortname = text_col(&row, "shortname")?;
        }

        let sql = format!(
            "SELECT {} AS name, {} AS value FROM {} WHERE name IN ('version', 'release')",
            self.dialect.text_expr("name"),
            self.dialect.text_expr("value"),
            self.table("config")
        );
        for row in self.fetch_all("site_config", &sql).await? {
            let value = text_col(&row, "value")?;
            match text_col(&row, "name")?.as_str() {
                "version" => site.version = value,
                "release" => site.release = value,
                _ => {}
            }
        }

        Ok(site)
    }

    async fn online_users(&self, cutoff: i64) -> Result<i64, ExporterError> {
        let sql = format!(
            "SELECT COUNT(*) AS online FROM {} WHERE lastaccess > {}",
            self.table("user"),
            self.dialect.param(1)
        );
        let row = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        int_col(&row, "online")
    }

    async fn user_counts(&self) -> Result<Vec<UserAuthRow>, ExporterError> {
        let sql = format!(
            "SELECT auth, \
                COUNT(CASE WHEN deleted = 0 AND suspended = 0 THEN 1 END) AS active, \
                COUNT(CASE WHEN deleted = 1 AND suspended = 0 THEN 1 END) AS deleted, \
                COUNT(CASE WHEN deleted = 0 AND suspended = 1 THEN 1 END) AS suspended \
             FROM {} \
             GROUP BY auth \
             ORDER BY auth",
            self.table("user")
        );
        self.fetch_all("user_counts", &sql)
            .await?
            .iter()
            .map(user_row)
            .collect()
    }

    async fn course_counts(&self) -> Result<Vec<CourseRow>, ExporterError> {
        let sql = format!(
            "SELECT format, theme, \
                COUNT(CASE WHEN visible = 1 THEN 1 END) AS visible, \
                COUNT(CASE WHEN visible = 0 THEN 1 END) AS hidden \
             FROM {} \
             GROUP BY format, theme \
             ORDER BY format, theme",
            self.table("course")
        );
        self.fetch_all("course_counts", &sql)
            .await?
            .iter()
            .map(course_row)
            .collect()
    }

    async fn enrolment_counts(&self) -> Result<Vec<EnrolmentRow>, ExporterError> {
        // Instance counts use DISTINCT because the join repeats each
        // instance once per user enrolment.
        let sql = format!(
            "SELECT e.enrol AS enrol, \
                COUNT(DISTINCT CASE WHEN e.status = 0 THEN e.id END) AS enabled, \
                COUNT(DISTINCT CASE WHEN e.status = 1 THEN e.id END) AS disabled, \
                COUNT(CASE WHEN ue.status = 0 THEN 1 END) AS active, \
                COUNT(CASE WHEN ue.status = 1 THEN 1 END) AS suspended \
             FROM {} e \
             LEFT JOIN {} ue ON ue.enrolid = e.id \
             GROUP BY e.enrol \
             ORDER BY e.enrol",
            self.table("enrol"),
            self.table("user_enrolments")
        );
        self.fetch_all("enrolment_counts", &sql)
            .await?
            .iter()
            .map(enrolment_row)
            .collect()
    }

    async fn module_counts(&self) -> Result<Vec<ModuleRow>, ExporterError> {
        let sql = format!(
            "SELECT m.name AS name, \
                COUNT(CASE WHEN cm.visible = 1 THEN 1 END) AS visible, \
                COUNT(CASE WHEN cm.visible = 0 THEN 1 END) AS hidden \
             FROM {} m \
             LEFT JOIN {} cm ON cm.module = m.id AND cm.deletioninprogress = 0 \
             GROUP BY m.id, m.name \
             ORDER BY m.name",
            self.table("modules"),
            self.table("course_modules")
        );
        self.fetch_all("module_counts", &sql)
            .await?
            .iter()
            .map(module_row)
            .collect()
    }

    async fn task_counts(&self, cutoff: i64) -> Result<Vec<TaskRow>, ExporterError> {
        // `result` is 0 on success and 1 on failure.
        let sql = format!(
            "SELECT component, classname, \
                COUNT(*) AS runs, \
                COUNT(CASE WHEN result <> 0 THEN 1 END) AS failures \
             FROM {} \
             WHERE timeend > {} \
             GROUP BY component, classname \
             ORDER BY component, classname",
            self.table("task_log"),
            self.dialect.param(1)
        );
        self.fetch_all_since("task_counts", &sql, cutoff)
            .await?
            .iter()
            .map(task_row)
            .collect()
    }

    async fn log_counts(&self, cutoff: i64) -> Result<Vec<LogRow>, ExporterError> {
        let sql = format!(
            "SELECT component, crud, {} AS edulevel, origin, COUNT(*) AS items \
             FROM {} \
             WHERE timecreated > {} \
             GROUP BY component, crud, edulevel, origin \
             ORDER BY component, crud, edulevel, origin",
            self.dialect.int_expr("edulevel"),
            self.table("logstore_standard_log"),
            self.dialect.param(1)
        );
        self.fetch_all_since("log_counts", &sql, cutoff)
            .await?
            .iter()
            .map(log_row)
            .collect()
    }
}

fn user_row(row: &AnyRow) -> Result<UserAuthRow, ExporterError> {
    Ok(UserAuthRow {
        auth: text_col(row, "auth")?,
        active: int_col(row, "active")?,
        deleted: int_col(row, "deleted")?,
        suspended: int_col(row, "suspended")?,
    })
}

fn course_row(row: &AnyRow) -> Result<CourseRow, ExporterError> {
    Ok(CourseRow {
        format: text_col(row, "format")?,
        theme: text_col(row, "theme")?,
        visible: int_col(row, "visible")?,
        hidden: int_col(row, "hidden")?,
    })
}

fn enrolment_row(row: &AnyRow) -> Result<EnrolmentRow, ExporterError> {
    Ok(EnrolmentRow {
        enrol: text_col(row, "enrol")?,
        enabled: int_col(row, "enabled")?,
        disabled: int_col(row, "disabled")?,
        active: int_col(row, "active")?,
        suspended: int_col(row, "suspended")?,
    })
}

fn module_row(row: &AnyRow) -> Result<ModuleRow, ExporterError> {
    Ok(ModuleRow {
        name: text_col(row, "name")?,
        visible: int_col(row, "visible")?,
        hidden: int_col(row, "hidden")?,
    })
}

fn task_row(row: &AnyRow) -> Result<TaskRow, ExporterError> {
    Ok(TaskRow {
        component: text_col(row, "component")?,
        classname: text_col(row, "classname")?,
        runs: int_col(row, "runs")?,
        failures: int_col(row, "failures")?,
    })
}

fn log_row(row: &AnyRow) -> Result<LogRow, ExporterError> {
    Ok(LogRow {
        component: text_col(row, "component")?,
        crud: text_col(row, "crud")?,
        edulevel: int_col(row, "edulevel")?,
        origin: text_col(row, "origin")?,
        items: int_col(row, "items")?,
    })
}

fn store_err(e: sqlx::Error) -> ExporterError {
    ExporterError::StoreError(e.to_string())
}

/// NULL text reads as an empty string.
fn text_col(row: &AnyRow, col: &str) -> Result<String, ExporterError> {
    row.try_get::<Option<String>, _>(col)
        .map(Option::unwrap_or_default)
        .map_err(store_err)
}

fn int_col(row: &AnyRow, col: &str) -> Result<i64, ExporterError> {
    row.try_get::<i64, _>(col).map_err(store_err)
}

/// Hide credentials before a URL reaches the logs.
fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
