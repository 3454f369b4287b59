pub mod exposition;

#[cfg(feature = "prometheus")]
pub mod stats;

pub use exposition::{Formatter, render};

#[cfg(feature = "prometheus")]
pub use stats::{ScrapeOutcome, ScrapeStats};
