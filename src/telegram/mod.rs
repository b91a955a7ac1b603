//! Telegram notification delivery

pub mod notifications;

// Re-exports for convenience
pub use notifications::{NoopNotifier, Notifier, TelegramNotifier};
