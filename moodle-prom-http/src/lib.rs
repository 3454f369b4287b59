pub mod error;
pub mod handlers;
pub mod server;
pub mod token;

pub use server::{AppState, MetricsServer, build_router};
