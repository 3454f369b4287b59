pub mod config;
pub mod error;
pub mod labels;
pub mod metric;

pub use config::ExporterConfig;
pub use error::ExporterError;
pub use labels::Labels;
pub use metric::{MetricRecord, MetricType, MetricValue};
