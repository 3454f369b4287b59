use crate::collector::{CollectContext, Collector};
use async_trait::async_trait;
use moodle_prom_core::config::CollectorToggles;
use moodle_prom_core::{ExporterError, Labels, MetricRecord};
use moodle_prom_store::CourseRow;

/// Visible and hidden courses per (format, theme).
pub struct CoursesCollector;

fn course_labels(row: &CourseRow) -> Labels {
    Labels::new()
        .with("theme", row.theme.as_str())
        .with("format", row.format.as_str())
}

#[async_trait]
impl Collector for CoursesCollector {
    fn name(&self) -> &str {
        "courses"
    }

    fn enabled(&self, toggles: &CollectorToggles) -> bool {
        toggles.courses
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
        let rows = ctx.source.course_counts().await?;
        let mut records = Vec::with_capacity(rows.len() * 2);

        for row in &rows {
            let labels = ctx.labels(course_labels(row));
            records.push(MetricRecord::gauge(
                "moodle_courses_visible",
                row.visible,
                labels.clone(),
                "Visible courses",
            ));
            records.push(MetricRecord::gauge(
                "moodle_courses_hidden",
                row.hidden,
                labels,
                "Hidden courses",
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
    async fn labels_theme_then_format() {
        let source = MemorySource {
            courses: vec![CourseRow {
                format: "topics".into(),
                theme: "".into(),
                visible: 3,
                hidden: 1,
            }],
            ..Default::default()
        };
        let defaults = Labels::new().with("site", "campus");
        let ctx = CollectContext {
            source: &source,
            default_labels: &defaults,
            cutoff: 0,
        };

        let records = CoursesCollector.collect(&ctx).await.unwrap();
        assert_eq!(records.len(), 2);
        let keys: Vec<&str> = records[0].labels.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["site", "theme", "format"]);
        assert_eq!(records[0].labels.get("theme"), Some(""));
        assert_eq!(records[0].value, MetricValue::Int(3));
        assert_eq!(records[1].name, "moodle_courses_hidden");
        assert_eq!(records[1].value, MetricValue::Int(1));
    }

    #[tokio::test]
    async fn empty_result_yields_no_records() {
        let source = MemorySource::default();
        let defaults = Labels::new();
        let ctx = CollectContext {
            source: &source,
            default_labels: &defaults,
            cutoff: 0,
        };
        assert!(CoursesCollector.collect(&ctx).await.unwrap().is_empty());
    }
}
