//! Live-stream platform abstraction layer.
//!
//! Provides the `StreamPlatform` trait that the stream probe talks to. Each
//! platform answers two questions: "is the channel live right now?" and "which
//! playback variants does the live stream offer?". Everything platform-specific
//! stays behind this trait.
//!
//! Built-in platforms:
//! - `TwitchClient`: GQL liveness + usher master playlist
//! - `VkClient`: VK Video Live public stream endpoint + master playlist

pub mod hls;
pub mod twitch;
pub mod vk;

pub use twitch::TwitchClient;
pub use vk::VkClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Platforms the recorder knows how to watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Vk,
}

/// Opaque per-platform pointer to the live stream's playback data.
///
/// Only the platform client that produced it knows what it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSource(Option<String>);

impl PlaybackSource {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self(Some(url.into()))
    }

    pub(crate) fn url(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Result of one liveness lookup. Discarded after the cycle that produced it.
#[derive(Debug, Clone)]
pub struct StreamCandidate {
    pub platform: Platform,
    pub online: bool,
    /// Broadcast start time, when the platform reports one
    pub started_at: Option<DateTime<Utc>>,
    pub playback_source: PlaybackSource,
}

impl StreamCandidate {
    pub fn offline(platform: Platform) -> Self {
        Self {
            platform,
            online: false,
            started_at: None,
            playback_source: PlaybackSource::none(),
        }
    }
}

/// One quality variant offered by a live stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackVariant {
    /// Quality tag, e.g. `1080p60`, `720p30`, `audio_only`
    pub label: String,
    /// `WIDTHxHEIGHT` from the playlist, when present
    pub resolution: Option<String>,
    /// Media playlist URL handed to ffmpeg
    pub source_url: String,
}

/// Errors returned by platform collaborators.
///
/// All of them are recoverable: the probe treats a failed call as "no candidate"
/// for the current cycle.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status: {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("stream is live but has no playback source")]
    NoPlaybackSource,

    #[error("stream is offline")]
    Offline,
}

/// Capability implemented by each live-streaming platform.
#[async_trait]
pub trait StreamPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    /// Looks up whether `channel` is live.
    async fn stream_info(&self, channel: &str) -> Result<StreamCandidate, PlatformError>;

    /// Fetches the playback variants of a live candidate returned by `stream_info`.
    async fn playback_variants(
        &self,
        channel: &str,
        candidate: &StreamCandidate,
    ) -> Result<Vec<PlaybackVariant>, PlatformError>;
}

/// Shared reqwest client settings for platform lookups.
pub(crate) fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(hls::BROWSER_USER_AGENT)
        .timeout(std::time::Duration::from_secs(20))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
}

/// Turns a non-success status into `PlatformError::Status`.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PlatformError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_tags_are_lowercase() {
        assert_eq!(Platform::Twitch.to_string(), "twitch");
        assert_eq!(Platform::Vk.as_ref(), "vk");
        assert_eq!(serde_json::to_string(&Platform::Vk).unwrap(), "\"vk\"");
    }

    #[test]
    fn test_offline_candidate() {
        let candidate = StreamCandidate::offline(Platform::Twitch);
        assert!(!candidate.online);
        assert!(candidate.started_at.is_none());
        assert_eq!(candidate.playback_source.url(), None);
    }
}
