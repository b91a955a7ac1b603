//! Concurrent liveness lookup across both platforms.

use std::sync::Arc;

use crate::core::status::{StatusKind, StatusReporter};
use crate::platform::{PlatformError, PlaybackVariant, StreamCandidate, StreamPlatform};

/// Liveness of both platforms for one cycle. `None` means the lookup failed.
#[derive(Debug, Default)]
pub struct ProbeResult {
    pub primary: Option<StreamCandidate>,
    pub secondary: Option<StreamCandidate>,
}

impl ProbeResult {
    /// The live candidate to record. Primary wins when both are live.
    pub fn pick_live(&self) -> Option<&StreamCandidate> {
        [self.primary.as_ref(), self.secondary.as_ref()]
            .into_iter()
            .flatten()
            .find(|c| c.online)
    }
}

pub struct StreamProbe {
    primary: Arc<dyn StreamPlatform>,
    secondary: Arc<dyn StreamPlatform>,
    channel: String,
}

impl StreamProbe {
    pub fn new(
        primary: Arc<dyn StreamPlatform>,
        secondary: Arc<dyn StreamPlatform>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            secondary,
            channel: channel.into(),
        }
    }

    /// Asks both platforms at once. A failure on one side never affects the other.
    pub async fn probe(&self, status: &StatusReporter) -> ProbeResult {
        let (primary, secondary) = tokio::join!(
            self.lookup(self.primary.as_ref(), status),
            self.lookup(self.secondary.as_ref(), status),
        );
        ProbeResult { primary, secondary }
    }

    async fn lookup(&self, platform: &dyn StreamPlatform, status: &StatusReporter) -> Option<StreamCandidate> {
        match platform.stream_info(&self.channel).await {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                log::debug!("{} stream lookup failed: {}", platform.platform(), e);
                status.update(
                    StatusKind::Error,
                    &format!("stream offline | error on {} request", platform.platform()),
                );
                None
            }
        }
    }

    /// Fetches the variant list of the chosen candidate from the platform that produced it.
    pub async fn variants(&self, candidate: &StreamCandidate) -> Result<Vec<PlaybackVariant>, PlatformError> {
        let platform = if candidate.platform == self.primary.platform() {
            &self.primary
        } else {
            &self.secondary
        };
        platform.playback_variants(&self.channel, candidate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn candidate(platform: Platform, online: bool) -> StreamCandidate {
        StreamCandidate {
            online,
            ..StreamCandidate::offline(platform)
        }
    }

    #[test]
    fn test_pick_live_prefers_primary() {
        let result = ProbeResult {
            primary: Some(candidate(Platform::Twitch, true)),
            secondary: Some(candidate(Platform::Vk, true)),
        };
        assert_eq!(result.pick_live().unwrap().platform, Platform::Twitch);
    }

    #[test]
    fn test_pick_live_falls_through_to_secondary() {
        let offline_primary = ProbeResult {
            primary: Some(candidate(Platform::Twitch, false)),
            secondary: Some(candidate(Platform::Vk, true)),
        };
        assert_eq!(offline_primary.pick_live().unwrap().platform, Platform::Vk);

        let failed_primary = ProbeResult {
            primary: None,
            secondary: Some(candidate(Platform::Vk, true)),
        };
        assert_eq!(failed_primary.pick_live().unwrap().platform, Platform::Vk);
    }

    #[test]
    fn test_offline_when_nothing_live() {
        assert!(ProbeResult::default().pick_live().is_none());
        let result = ProbeResult {
            primary: Some(candidate(Platform::Twitch, false)),
            secondary: None,
        };
        assert!(result.pick_live().is_none());
    }
}
