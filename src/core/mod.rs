//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod status;
pub mod utils;
pub mod web_server;

// Re-exports for convenience
pub use config::{ConfigError, RecorderConfig};
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use status::{StatusKind, StatusReporter};
