pub mod builtin;
pub mod collector;
pub mod registry;
pub mod scrape;

pub use builtin::register_all;
pub use collector::{CollectContext, Collector};
pub use registry::CollectorRegistry;
pub use scrape::{ScrapeOutput, Scraper};
