//! Prometheus text exposition format.
//!
//! A [`Formatter`] remembers which metric names already had their
//! `# HELP` / `# TYPE` header written, so it must be created fresh for each
//! response. Feed it records sorted by name to keep each metric's samples
//! under a single header block.

use moodle_prom_core::MetricRecord;
use std::borrow::Cow;
use std::collections::HashSet;

/// Stateful serializer for one output stream.
#[derive(Debug, Default)]
pub struct Formatter {
    seen: HashSet<String>,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one record, prefixed with its header block on the first
    /// occurrence of its name.
    pub fn format(&mut self, record: &MetricRecord) -> String {
        let mut out = String::new();
        self.write(record, &mut out);
        out
    }

    /// Append one record to `out`.
    pub fn write(&mut self, record: &MetricRecord, out: &mut String) {
        if !self.seen.contains(&record.name) {
            if !self.seen.is_empty() {
                out.push('\n');
            }
            if !record.help.is_empty() {
                out.push_str("# HELP ");
                out.push_str(&record.name);
                out.push(' ');
                out.push_str(&record.help);
                out.push('\n');
            }
            out.push_str("# TYPE ");
            out.push_str(&record.name);
            out.push(' ');
            out.push_str(record.metric_type.as_str());
            out.push('\n');

            self.seen.insert(record.name.clone());
        }

        out.push_str(&record.name);
        write_labels(record, out);
        out.push(' ');
        out.push_str(&record.value.to_string());
        if let Some(ts) = record.timestamp {
            let mut buf = itoa::Buffer::new();
            out.push(' ');
            out.push_str(buf.format(ts));
        }
        out.push('\n');
    }

    /// Whether a header block was already written for `name`.
    pub fn has_seen(&self, name: &str) -> bool {
        self.seen.contains(name)
    }
}

/// Render a whole record sequence with a fresh formatter.
pub fn render<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let mut formatter = Formatter::new();
    let mut out = String::new();
    for record in records {
        formatter.write(record, &mut out);
    }
    out
}

/// `{name="value",...}`, or nothing for an empty set.
fn write_labels(record: &MetricRecord, out: &mut String) {
    if record.labels.is_empty() {
        return;
    }
    out.push('{');
    for (i, (name, value)) in record.labels.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_label_value(value));
        out.push('"');
    }
    out.push('}');
}

/// Prefix `\` and `"` with a backslash. Nothing else is escaped; label
/// names and other control characters pass through untouched.
pub fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
