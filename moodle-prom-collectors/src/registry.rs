use crate::collector::Collector;
use moodle_prom_core::config::CollectorToggles;
use std::sync::Arc;

/// Ordered collector registry.
///
/// Built once at startup, immutable thereafter. Registration order is the
/// order records are merged in before sorting.
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
        }
    }

    /// Register a collector. A collector with the same name is replaced
    /// in place.
    pub fn register(&mut self, collector: Arc<dyn Collector>) {
        let name = collector.name().to_string();
        tracing::info!(collector = %name, "Registered collector");
        match self.collectors.iter_mut().find(|c| c.name() == name) {
            Some(slot) => *slot = collector,
            None => self.collectors.push(collector),
        }
    }

    /// Get a collector by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Collector>> {
        self.collectors.iter().find(|c| c.name() == name)
    }

    /// List all registered collector names.
    pub fn list(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Collectors switched on by `toggles`, in registration order.
    pub fn enabled(&self, toggles: &CollectorToggles) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .iter()
            .filter(|c| c.enabled(toggles))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectContext;
    use async_trait::async_trait;
    use moodle_prom_core::{ExporterError, MetricRecord};

    struct MockCollector {
        name: String,
        on: bool,
    }

    #[async_trait]
    impl Collector for MockCollector {
        fn name(&self) -> &str {
            &self.name
        }
        fn enabled(&self, _: &CollectorToggles) -> bool {
            self.on
        }
        async fn collect(&self, _: &CollectContext<'_>) -> Result<Vec<MetricRecord>, ExporterError> {
            Ok(Vec::new())
        }
    }

    fn mock(name: &str, on: bool) -> Arc<dyn Collector> {
        Arc::new(MockCollector {
            name: name.into(),
            on,
        })
    }

    #[test]
    fn test_empty_registry() {
        let reg = CollectorRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn test_register_keeps_order() {
        let mut reg = CollectorRegistry::new();
        for name in ["users", "courses", "tasks"] {
            reg.register(mock(name, true));
        }
        assert_eq!(reg.list(), vec!["users", "courses", "tasks"]);
        assert_eq!(reg.get("courses").unwrap().name(), "courses");
    }

    #[test]
    fn test_register_overwrite_in_place() {
        let mut reg = CollectorRegistry::new();
        reg.register(mock("a", true));
        reg.register(mock("b", true));
        reg.register(mock("a", false));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list(), vec!["a", "b"]);
        assert!(!reg.get("a").unwrap().enabled(&CollectorToggles::default()));
    }

    #[test]
    fn test_enabled_filters() {
        let mut reg = CollectorRegistry::new();
        reg.register(mock("on", true));
        reg.register(mock("off", false));
        let enabled = reg.enabled(&CollectorToggles::default());
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), "on");
    }

    #[test]
    fn test_default_is_empty() {
        assert!(CollectorRegistry::default().is_empty());
    }
}
