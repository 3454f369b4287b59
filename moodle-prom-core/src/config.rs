use crate::error::ExporterError;
use figment::{Figment, providers::{Env, Format, Yaml}};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reserved for the health check endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Top-level exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub collectors: CollectorToggles,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

/// Shared-secret authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Scrapers must send this as `?token=`. Unset or empty disables the check.
    #[serde(default)]
    pub token: Option<String>,
}

/// Moodle database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx URL: `postgres://`, `mysql://` or `sqlite:`.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Default label settings applied to every record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_true", alias = "sitetag")]
    pub site_tag: bool,
    #[serde(default, alias = "versiontag")]
    pub version_tag: bool,
    /// Overrides the site short name read from the database.
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    /// Free text, one `key=value` per line.
    #[serde(default, alias = "extratags")]
    pub extra_tags: String,
}

/// One switch per collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorToggles {
    #[serde(default = "default_true", alias = "userstatistics")]
    pub users: bool,
    #[serde(default = "default_true", alias = "coursestatistics")]
    pub courses: bool,
    #[serde(default = "default_true", alias = "enrolstatistics")]
    pub enrolments: bool,
    #[serde(default = "default_true", alias = "modulestatistics")]
    pub modules: bool,
    #[serde(default = "default_true", alias = "taskstatistics")]
    pub tasks: bool,
    #[serde(default = "default_true", alias = "activitystatistics")]
    pub activity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Window used when the request carries no `timeframe`.
    #[serde(default = "default_timeframe")]
    pub default_timeframe_secs: i64,
    /// Run enabled collectors concurrently. Output order is unchanged.
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub self_metrics: SelfMetricsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfMetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_self_metrics_path")]
    pub path: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:9190".into() }
fn default_metrics_path() -> String { "/metrics".into() }
fn default_table_prefix() -> String { "mdl_".into() }
fn default_max_connections() -> u32 { 4 }
fn default_connect_timeout() -> u64 { 5 }
fn default_true() -> bool { true }
fn default_timeframe() -> i64 { 300 }
fn default_self_metrics_path() -> String { "/exporter/metrics".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            table_prefix: default_table_prefix(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            site_tag: true,
            version_tag: false,
            site_name: None,
            version: None,
            release: None,
            extra_tags: String::new(),
        }
    }
}

impl Default for CollectorToggles {
    fn default() -> Self {
        Self {
            users: true,
            courses: true,
            enrolments: true,
            modules: true,
            tasks: true,
            activity: true,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            default_timeframe_secs: default_timeframe(),
            parallel: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Text,
            self_metrics: SelfMetricsConfig::default(),
        }
    }
}

impl Default for SelfMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_self_metrics_path(),
        }
    }
}

impl AuthConfig {
    /// The configured secret, if token auth is active.
    pub fn secret(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl ExporterConfig {
    /// Load configuration from YAML file + env overrides, then validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: ExporterConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MOODLE_PROM_").split("__"))
            .extract()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject settings that would only fail later, at scrape time.
    pub fn validate(&self) -> Result<(), ExporterError> {
        let prefix_re = Regex::new(r"^[A-Za-z0-9_]*$")
            .map_err(|e| ExporterError::Internal(e.to_string()))?;
        if !prefix_re.is_match(&self.database.table_prefix) {
            return Err(ExporterError::ConfigError(format!(
                "database.table_prefix {:?} may only contain letters, digits and '_'",
                self.database.table_prefix
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ExporterError::ConfigError(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.scrape.default_timeframe_secs < 0 {
            return Err(ExporterError::ConfigError(
                "scrape.default_timeframe_secs must not be negative".into(),
            ));
        }
        for (key, path) in [
            ("server.metrics_path", &self.server.metrics_path),
            ("observability.self_metrics.path", &self.observability.self_metrics.path),
        ] {
            if !path.starts_with('/') {
                return Err(ExporterError::ConfigError(format!(
                    "{key} must start with '/', got {path:?}"
                )));
            }
            if path == HEALTH_PATH {
                return Err(ExporterError::ConfigError(format!(
                    "{key} may not be {HEALTH_PATH}"
                )));
            }
        }
        if self.observability.self_metrics.enabled
            && self.observability.self_metrics.path == self.server.metrics_path
        {
            return Err(ExporterError::ConfigError(
                "observability.self_metrics.path must differ from server.metrics_path".into(),
            ));
        }
        Ok(())
    }
}
