//! crypto_aggregator_rust - crypto price polling and aggregation service

pub mod api;
pub mod app;
pub mod config;

pub use api::{router, AppState};
pub use app::Engine;
pub use config::{Config, LayoutItemConfig};
