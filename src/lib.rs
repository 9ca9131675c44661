pub mod app;
pub mod areas;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod types;
