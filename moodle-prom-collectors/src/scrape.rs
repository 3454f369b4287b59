use crate::collector::{CollectContext, Collector};
use crate::registry::CollectorRegistry;
use futures::future::try_join_all;
use moodle_prom_core::config::{CollectorToggles, LabelsConfig};
use moodle_prom_core::labels::{SiteInfo, default_labels};
use moodle_prom_core::{ExporterConfig, ExporterError, Labels, MetricRecord};
use moodle_prom_observability::render;
use moodle_prom_store::MoodleSource;
use std::sync::Arc;

/// A rendered exposition body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutput {
    pub body: String,
    pub records: usize,
}

/// Runs the enabled collectors against a source and renders the result.
///
/// Holds no per-request state; every scrape builds its own label set and
/// renders through a fresh formatter.
pub struct Scraper {
    registry: Arc<CollectorRegistry>,
    source: Arc<dyn MoodleSource>,
    labels: LabelsConfig,
    toggles: CollectorToggles,
    parallel: bool,
}

impl Scraper {
    pub fn new(
        registry: Arc<CollectorRegistry>,
        source: Arc<dyn MoodleSource>,
        config: &ExporterConfig,
    ) -> Self {
        Self {
            registry,
            source,
            labels: config.labels.clone(),
            toggles: config.collectors.clone(),
            parallel: config.scrape.parallel,
        }
    }

    /// Names of the collectors a scrape would run.
    pub fn enabled_collectors(&self) -> Vec<String> {
        self.registry
            .enabled(&self.toggles)
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Build the request-wide default labels, reading site info only
    /// when a tag needs a value the config does not override.
    pub async fn default_labels(&self) -> Result<Labels, ExporterError> {
        let cfg = &self.labels;
        let needs_site = (cfg.site_tag && cfg.site_name.is_none())
            || (cfg.version_tag && (cfg.version.is_none() || cfg.release.is_none()));

        let site = if needs_site {
            self.source.site_info().await?
        } else {
            SiteInfo::default()
        };

        Ok(default_labels(cfg, &site))
    }

    /// Run every enabled collector and return the merged records in
    /// registration order. The first failure aborts the scrape.
    pub async fn collect(
        &self,
        cutoff: i64,
        default_labels: &Labels,
    ) -> Result<Vec<MetricRecord>, ExporterError> {
        let collectors = self.registry.enabled(&self.toggles);
        let ctx = CollectContext {
            source: self.source.as_ref(),
            default_labels,
            cutoff,
        };

        let batches = if self.parallel {
            try_join_all(collectors.iter().map(|c| run_collector(c.as_ref(), &ctx))).await?
        } else {
            let mut batches = Vec::with_capacity(collectors.len());
            for collector in &collectors {
                batches.push(run_collector(collector.as_ref(), &ctx).await?);
            }
            batches
        };

        Ok(batches.into_iter().flatten().collect())
    }

    /// Produce the full exposition body for one request.
    ///
    /// `timeframe` is in seconds and may be negative, which moves the
    /// cutoff into the future.
    pub async fn scrape(&self, now: i64, timeframe: i64) -> Result<ScrapeOutput, ExporterError> {
        let cutoff = now.saturating_sub(timeframe);
        let labels = self.default_labels().await?;
        let mut records = self.collect(cutoff, &labels).await?;

        sort_by_name(&mut records);

        let body = render(&records);

        tracing::debug!(records = records.len(), cutoff, "Scrape rendered");

        Ok(ScrapeOutput {
            body,
            records: records.len(),
        })
    }
}

async fn run_collector(
    collector: &dyn Collector,
    ctx: &CollectContext<'_>,
) -> Result<Vec<MetricRecord>, ExporterError> {
    match collector.collect(ctx).await {
        Ok(records) => {
            tracing::debug!(collector = collector.name(), records = records.len(), "Collected");
            Ok(records)
        }
        Err(e) => {
            tracing::warn!(collector = collector.name(), error = %e, "Collector failed");
            Err(e)
        }
    }
}

/// Stable sort by metric name, byte-wise.
pub fn sort_by_name(records: &mut [MetricRecord]) {
    records.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::register_all;
    use moodle_prom_store::MemorySource;
    use moodle_prom_core::MetricValue;
    use moodle_prom_store::{CourseRow, TaskRow, UserAuthRow};

    fn registry() -> Arc<CollectorRegistry> {
        let mut reg = CollectorRegistry::new();
        register_all(&mut reg);
        Arc::new(reg)
    }

    fn quiet_config() -> ExporterConfig {
        let mut config = ExporterConfig::default();
        config.labels.site_tag = false;
        config.labels.version_tag = false;
        config
    }

    fn site() -> SiteInfo {
        SiteInfo {
            shortname: "campus".into(),
            version: "2022041900".into(),
            release: "4.0".into(),
        }
    }

    #[test]
    fn sort_is_stable_across_equal_names() {
        let mut records = vec![
            MetricRecord::gauge("b_metric", 1, Labels::new(), ""),
            MetricRecord::gauge("a_metric", 2, Labels::new(), ""),
            MetricRecord::gauge("a_metric", 3, Labels::new(), ""),
        ];
        sort_by_name(&mut records);
        let order: Vec<(&str, MetricValue)> =
            records.iter().map(|r| (r.name.as_str(), r.value)).collect();
        assert_eq!(
            order,
            vec![
                ("a_metric", MetricValue::Int(2)),
                ("a_metric", MetricValue::Int(3)),
                ("b_metric", MetricValue::Int(1)),
            ]
        );
    }

    #[tokio::test]
    async fn single_online_gauge_body() {
        let mut config = quiet_config();
        config.collectors = CollectorToggles {
            users: true,
            courses: false,
            enrolments: false,
            modules: false,
            tasks: false,
            activity: false,
        };
        let source = Arc::new(MemorySource {
            online: 42,
            ..Default::default()
        });
        let scraper = Scraper::new(registry(), source, &config);

        let out = scraper.scrape(1_000, 300).await.unwrap();
        assert_eq!(
            out.body,
            "# HELP moodle_users_online Users online\n\
             # TYPE moodle_users_online gauge\n\
             moodle_users_online 42\n"
        );
        assert_eq!(out.records, 1);
    }

    #[tokio::test]
    async fn cutoff_is_now_minus_timeframe() {
        let source = Arc::new(MemorySource::default());
        let scraper = Scraper::new(registry(), source.clone(), &quiet_config());

        scraper.scrape(10_000, 600).await.unwrap();
        let cutoffs = source.log.cutoffs();
        assert!(!cutoffs.is_empty());
        assert!(cutoffs.iter().all(|c| *c == 9_400));
    }

    #[tokio::test]
    async fn negative_timeframe_moves_cutoff_forward() {
        let source = Arc::new(MemorySource::default());
        let scraper = Scraper::new(registry(), source.clone(), &quiet_config());

        scraper.scrape(10_000, -50).await.unwrap();
        assert!(source.log.cutoffs().iter().all(|c| *c == 10_050));
    }

    #[tokio::test]
    async fn output_sorted_with_one_header_per_name() {
        let source = Arc::new(MemorySource {
            online: 3,
            users: vec![UserAuthRow {
                auth: "manual".into(),
                active: 5,
                deleted: 0,
                suspended: 1,
            }],
            courses: vec![CourseRow {
                format: "topics".into(),
                theme: "".into(),
                visible: 2,
                hidden: 0,
            }],
            tasks: vec![
                TaskRow {
                    component: "core".into(),
                    classname: "a".into(),
                    runs: 1,
                    failures: 0,
                },
                TaskRow {
                    component: "core".into(),
                    classname: "b".into(),
                    runs: 4,
                    failures: 2,
                },
            ],
            ..Default::default()
        });
        let scraper = Scraper::new(registry(), source, &quiet_config());
        let body = scraper.scrape(1_000, 300).await.unwrap().body;

        let sample_names: Vec<&str> = body
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.split(['{', ' ']).next().unwrap_or(""))
            .collect();
        let mut sorted = sample_names.clone();
        sorted.sort();
        assert_eq!(sample_names, sorted);

        assert_eq!(body.matches("# TYPE moodle_task_runs gauge").count(), 1);
        assert!(body.contains(
            "moodle_task_runs{component=\"core\",classname=\"a\"} 1\n\
             moodle_task_runs{component=\"core\",classname=\"b\"} 4\n"
        ));
    }

    #[tokio::test]
    async fn body_is_rendered_sorted_records() {
        let source = Arc::new(MemorySource {
            online: 9,
            site: site(),
            users: vec![UserAuthRow {
                auth: "ldap".into(),
                active: 4,
                deleted: 1,
                suspended: 0,
            }],
            ..Default::default()
        });
        let scraper = Scraper::new(registry(), source, &ExporterConfig::default());

        let labels = scraper.default_labels().await.unwrap();
        let mut records = scraper.collect(700, &labels).await.unwrap();
        sort_by_name(&mut records);

        let out = scraper.scrape(1_000, 300).await.unwrap();
        assert_eq!(out.body, render(&records));
        assert_eq!(out.records, records.len());
    }

    #[tokio::test]
    async fn repeated_scrapes_are_identical() {
        let source = Arc::new(MemorySource {
            online: 7,
            site: site(),
            ..Default::default()
        });
        let scraper = Scraper::new(registry(), source, &ExporterConfig::default());

        let first = scraper.scrape(1_000, 300).await.unwrap();
        let second = scraper.scrape(1_000, 300).await.unwrap();
        assert_eq!(first, second);
        assert!(second.body.contains("# TYPE moodle_users_online gauge"));
    }

    #[tokio::test]
    async fn site_labels_from_source() {
        let source = Arc::new(MemorySource {
            online: 1,
            site: site(),
            ..Default::default()
        });
        let mut config = ExporterConfig::default();
        config.labels.version_tag = true;
        let scraper = Scraper::new(registry(), source.clone(), &config);

        let labels = scraper.default_labels().await.unwrap();
        let pairs: Vec<(&str, &str)> = labels.iter().collect();
        assert_eq!(
            pairs,
            vec![("site", "campus"), ("version", "2022041900"), ("release", "4.0")]
        );
        assert_eq!(source.log.site_queries(), 1);
    }

    #[tokio::test]
    async fn site_info_skipped_when_tags_off() {
        let mut config = quiet_config();
        config.labels.extra_tags = "env=prod\nnot a tag\n=empty\n".into();
        let source = Arc::new(MemorySource::default());
        let scraper = Scraper::new(registry(), source.clone(), &config);

        let labels = scraper.default_labels().await.unwrap();
        assert_eq!(labels, Labels::new().with("env", "prod"));
        assert_eq!(source.log.site_queries(), 0);
    }

    #[tokio::test]
    async fn site_info_skipped_when_fully_overridden() {
        let mut config = ExporterConfig::default();
        config.labels.version_tag = true;
        config.labels.site_name = Some("override".into());
        config.labels.version = Some("1".into());
        config.labels.release = Some("r".into());
        let source = Arc::new(MemorySource::default());
        let scraper = Scraper::new(registry(), source.clone(), &config);

        let labels = scraper.default_labels().await.unwrap();
        assert_eq!(labels.get("site"), Some("override"));
        assert_eq!(source.log.site_queries(), 0);
    }

    #[tokio::test]
    async fn disabled_collectors_issue_no_queries() {
        let mut config = quiet_config();
        config.collectors = CollectorToggles {
            users: false,
            courses: false,
            enrolments: false,
            modules: false,
            tasks: false,
            activity: false,
        };
        let source = Arc::new(MemorySource::default());
        let scraper = Scraper::new(registry(), source.clone(), &config);

        let out = scraper.scrape(1_000, 300).await.unwrap();
        assert_eq!(out.body, "");
        assert_eq!(out.records, 0);
        assert_eq!(source.log.queries(), 0);
        assert!(scraper.enabled_collectors().is_empty());
    }

    #[tokio::test]
    async fn failure_aborts_whole_scrape() {
        let source = Arc::new(MemorySource {
            failing: true,
            ..Default::default()
        });
        let scraper = Scraper::new(registry(), source, &quiet_config());
        let err = scraper.scrape(1_000, 300).await.unwrap_err();
        assert!(matches!(err, ExporterError::StoreError(_)));
    }

    #[tokio::test]
    async fn parallel_matches_sequential() {
        let fixture = || MemorySource {
            online: 2,
            users: vec![UserAuthRow {
                auth: "manual".into(),
                active: 1,
                deleted: 1,
                suspended: 0,
            }],
            courses: vec![CourseRow {
                format: "weeks".into(),
                theme: "boost".into(),
                visible: 1,
                hidden: 1,
            }],
            site: site(),
            ..Default::default()
        };

        let sequential = Scraper::new(registry(), Arc::new(fixture()), &ExporterConfig::default());
        let mut config = ExporterConfig::default();
        config.scrape.parallel = true;
        let parallel = Scraper::new(registry(), Arc::new(fixture()), &config);

        assert_eq!(
            sequential.scrape(5_000, 300).await.unwrap(),
            parallel.scrape(5_000, 300).await.unwrap()
        );
    }
}
