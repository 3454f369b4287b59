use crate::config::LabelsConfig;
use serde::{Deserialize, Serialize};

/// Ordered label set.
///
/// Insertion order is kept so one record always renders its labels the
/// same way. Inserting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Overlay `other` on top of `self`; `other` wins on collisions.
    pub fn merged(&self, other: &Labels) -> Labels {
        let mut out = self.clone();
        for (name, value) in other.iter() {
            out.insert(name, value);
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for (k, v) in iter {
            labels.insert(k, v);
        }
        labels
    }
}

/// Site identity as stored by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteInfo {
    pub shortname: String,
    pub version: String,
    pub release: String,
}

/// Parse operator-supplied `key=value` lines.
///
/// Each line is split once on the first `=` and both halves are trimmed.
/// Lines without `=` or with an empty key are skipped.
pub fn parse_extra_tags(text: &str) -> Labels {
    let mut labels = Labels::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        labels.insert(key, value.trim());
    }
    labels
}

/// Build the request-wide default label set.
///
/// Config overrides take precedence over the values read from the site.
pub fn default_labels(config: &LabelsConfig, site: &SiteInfo) -> Labels {
    let mut labels = Labels::new();

    if config.site_tag {
        let name = config.site_name.as_deref().unwrap_or(&site.shortname);
        labels.insert("site", name);
    }

    if config.version_tag {
        labels.insert("version", config.version.as_deref().unwrap_or(&site.version));
        labels.insert("release", config.release.as_deref().unwrap_or(&site.release));
    }

    for (key, value) in parse_extra_tags(&config.extra_tags).iter() {
        labels.insert(key, value);
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteInfo {
        SiteInfo {
            shortname: "campus".into(),
            version: "2022041900".into(),
            release: "4.0 (Build: 20220419)".into(),
        }
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut labels = Labels::new().with("a", "1").with("b", "2");
        labels.insert("a", "3");
        let pairs: Vec<_> = labels.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn merged_prefers_other_and_keeps_base_order() {
        let base = Labels::new().with("site", "campus").with("env", "prod");
        let row = Labels::new().with("auth", "manual").with("env", "dev");
        let merged = base.merged(&row);
        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(
            pairs,
            vec![("site", "campus"), ("env", "dev"), ("auth", "manual")]
        );
        // Source sets are untouched.
        assert_eq!(base.get("env"), Some("prod"));
    }

    #[test]
    fn extra_tags_trim_and_skip_invalid_lines() {
        let labels = parse_extra_tags("env=prod\ninvalidline\nregion = eu");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("env"), Some("prod"));
        assert_eq!(labels.get("region"), Some("eu"));
        assert_eq!(labels.get("invalidline"), None);
    }

    #[test]
    fn extra_tags_split_on_first_equals_only() {
        let labels = parse_extra_tags("query=a=b");
        assert_eq!(labels.get("query"), Some("a=b"));
    }

    #[test]
    fn extra_tags_skip_empty_key_and_handle_crlf() {
        let labels = parse_extra_tags("=orphan\r\nzone=b\r\n\r\n");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("zone"), Some("b"));
    }

    #[test]
    fn default_labels_follow_toggles() {
        let mut cfg = LabelsConfig::default();
        cfg.site_tag = true;
        cfg.version_tag = false;
        let labels = default_labels(&cfg, &site());
        assert_eq!(labels.get("site"), Some("campus"));
        assert_eq!(labels.get("version"), None);

        cfg.site_tag = false;
        cfg.version_tag = true;
        let labels = default_labels(&cfg, &site());
        assert_eq!(labels.get("site"), None);
        assert_eq!(labels.get("version"), Some("2022041900"));
        assert_eq!(labels.get("release"), Some("4.0 (Build: 20220419)"));
    }

    #[test]
    fn default_labels_prefer_configured_overrides() {
        let cfg = LabelsConfig {
            site_tag: true,
            version_tag: true,
            site_name: Some("override".into()),
            version: Some("1".into()),
            release: None,
            extra_tags: String::new(),
        };
        let labels = default_labels(&cfg, &site());
        assert_eq!(labels.get("site"), Some("override"));
        assert_eq!(labels.get("version"), Some("1"));
        assert_eq!(labels.get("release"), Some("4.0 (Build: 20220419)"));
    }

    #[test]
    fn extra_tags_override_builtin_labels() {
        let cfg = LabelsConfig {
            site_tag: true,
            extra_tags: "site=elsewhere".into(),
            ..LabelsConfig::default()
        };
        let labels = default_labels(&cfg, &site());
        assert_eq!(labels.get("site"), Some("elsewhere"));
        assert_eq!(labels.len(), 1);
    }
}
