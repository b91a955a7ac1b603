//! livegrab - records a live channel from Twitch or VK Video Live with ffmpeg
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, status surface and the HTTP trigger
//! - `platform`: per-platform liveness and playlist lookups
//! - `download`: ffmpeg command building, quality selection and process supervision
//! - `watcher`: the check cycle state machine and its scheduler
//! - `telegram`: notification delivery

pub mod cli;
pub mod core;
pub mod download;
pub mod platform;
pub mod telegram;
pub mod watcher;

// Re-exports for convenience
pub use self::core::{AppError, AppResult, RecorderConfig};
pub use watcher::{CycleOutcome, Orchestrator, RecorderState};
