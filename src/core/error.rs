use thiserror::Error;

use crate::core::config::ConfigError;
use crate::platform::PlatformError;

/// Centralized error types for the application
///
/// Every fallible path in the recorder converts into this enum so the orchestrator
/// can log one consistent shape and keep running. Uses `thiserror` for automatic
/// error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use livegrab::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Startup configuration errors (fatal)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stream lookup / playlist errors from a platform collaborator
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// ffmpeg spawn / pipe failures
    #[error("Process error: {0}")]
    Process(String),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
