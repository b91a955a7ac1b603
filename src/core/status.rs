//! Human-readable status surface.
//!
//! Every state change of the recorder produces a timestamped line
//! (`2026-10-14T12-00-00 | stream offline | waiting...`). Significant events
//! additionally go to the configured `Notifier` in the background.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::core::utils::now_string;
use crate::download::progress::ProgressSnapshot;
use crate::telegram::Notifier;

/// Minimum spacing between progress lines written at info level.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Severity of a transient status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Nothing to do
    Waiting,
    /// A check or recording is in progress
    Active,
    /// Something went wrong in this cycle
    Error,
}

pub struct StatusReporter {
    notifier: Arc<dyn Notifier>,
    last_line: Mutex<String>,
    last_progress_log: Mutex<Option<Instant>>,
}

impl StatusReporter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            last_line: Mutex::new(String::new()),
            last_progress_log: Mutex::new(None),
        }
    }

    /// Writes a transient status line.
    pub fn update(&self, kind: StatusKind, text: &str) {
        let line = format!("{} | {}", now_string(), text);
        match kind {
            StatusKind::Waiting | StatusKind::Active => log::info!("{}", line),
            StatusKind::Error => log::warn!("{}", line),
        }
        self.remember(line);
    }

    /// Writes a significant event and mirrors it to the notifier.
    pub fn message(&self, text: &str, ok: bool) {
        let line = format!("{} | {}", now_string(), text);
        if ok {
            log::info!("√ {}", line);
        } else {
            log::warn!("× {}", line);
        }
        self.remember(line.clone());
        self.notify(line);
    }

    /// Reports a progress tick, throttled at info level.
    pub fn progress(&self, snapshot: &ProgressSnapshot) {
        let text = format!(
            "{} | downloading   | {} | {:>4} | {:>10}",
            now_string(),
            snapshot.time,
            snapshot.bitrate,
            snapshot.size
        );

        let due = {
            let mut last = self
                .last_progress_log
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let due = last.map_or(true, |at| at.elapsed() >= PROGRESS_LOG_INTERVAL);
            if due {
                *last = Some(Instant::now());
            }
            due
        };

        if due {
            log::info!("{}", text);
        } else {
            log::debug!("{}", text);
        }
        self.remember(text);
    }

    /// The most recent status line.
    pub fn last_line(&self) -> String {
        self.last_line.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn remember(&self, line: String) {
        *self.last_line.lock().unwrap_or_else(PoisonError::into_inner) = line;
    }

    fn notify(&self, line: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!("No runtime available, notification dropped");
            return;
        };
        let notifier = Arc::clone(&self.notifier);
        handle.spawn(async move {
            if let Err(e) = notifier.send(&line).await {
                log::debug!("Notification delivery failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn send(&self, text: &str) -> AppResult<()> {
            let _ = self.0.send(text.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _text: &str) -> AppResult<()> {
            Err(crate::core::error::AppError::Process("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_message_is_mirrored_to_notifier() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let status = StatusReporter::new(Arc::new(ChannelNotifier(tx)));

        status.message("stream online | platform: twitch", true);

        let sent = rx.recv().await.unwrap();
        assert!(sent.ends_with(" | stream online | platform: twitch"));
        assert_eq!(status.last_line(), sent);
    }

    #[tokio::test]
    async fn test_update_is_not_mirrored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let status = StatusReporter::new(Arc::new(ChannelNotifier(tx)));

        status.update(StatusKind::Waiting, "stream offline | waiting...");

        assert!(status.last_line().ends_with("stream offline | waiting..."));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let status = StatusReporter::new(Arc::new(FailingNotifier));
        status.message("recording finished", true);
        tokio::task::yield_now().await;
        assert!(status.last_line().ends_with("recording finished"));
    }

    #[test]
    fn test_progress_line_layout() {
        let status = StatusReporter::new(Arc::new(crate::telegram::NoopNotifier));
        status.progress(&ProgressSnapshot {
            size: "1024kB".to_string(),
            time: "00:00:10.00".to_string(),
            bitrate: "800.0kbits/s".to_string(),
        });
        assert!(status
            .last_line()
            .ends_with("| downloading   | 00:00:10.00 | 800.0kbits/s |     1024kB"));
    }
}
