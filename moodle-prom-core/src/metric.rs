use crate::error::ExporterError;
use crate::labels::Labels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exposition-format metric types.
///
/// Only gauges are produced today. Histogram and summary are carried for
/// the `# TYPE` line but their bucket/quantile series are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample value. Floats are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    /// Checked float constructor; NaN and infinities are rejected.
    pub fn float(value: f64) -> Result<Self, ExporterError> {
        if value.is_finite() {
            Ok(MetricValue::Float(value))
        } else {
            Err(ExporterError::InvalidValue(value.to_string()))
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl fmt::Display for MetricValue {
    /// Integers in plain decimal; floats in shortest round-trip form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Int(v) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(v))
            }
            MetricValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One sample line of the exposition output.
///
/// `name` must be a valid metric name (`[a-zA-Z_:][a-zA-Z0-9_:]*`); this is
/// a precondition and is not checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub metric_type: MetricType,
    pub name: String,
    pub value: MetricValue,
    pub labels: Labels,
    pub help: String,
    /// Epoch seconds.
    pub timestamp: Option<i64>,
}

impl MetricRecord {
    pub fn new(
        metric_type: MetricType,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        labels: Labels,
        help: impl Into<String>,
    ) -> Self {
        Self {
            metric_type,
            name: name.into(),
            value: value.into(),
            labels,
            help: help.into(),
            timestamp: None,
        }
    }

    pub fn gauge(
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        labels: Labels,
        help: impl Into<String>,
    ) -> Self {
        Self::new(MetricType::Gauge, name, value, labels, help)
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
