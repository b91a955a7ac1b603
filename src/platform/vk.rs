//! VkClient: VK Video Live channel lookup.
//!
//! The public blog stream endpoint reports liveness, the start time and a set of
//! player URLs. The HLS one is kept as the candidate's playback source and its
//! master playlist is fetched on demand.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::platform::{
    check_status, hls, http_client, PlatformError, PlaybackSource, PlaybackVariant, Platform, StreamCandidate,
    StreamPlatform,
};

const API_BASE: &str = "https://api.live.vkvideo.ru/v1/blog";

/// Player URL types carrying an HLS master playlist, in preference order.
const HLS_TYPES: [&str; 2] = ["live_hls", "live_playback_hls"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BlogStream {
    is_online: bool,
    /// Unix seconds
    start_time: Option<i64>,
    data: Vec<StreamData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StreamData {
    player_urls: Vec<PlayerUrl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerUrl {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

impl BlogStream {
    fn hls_url(&self) -> Option<&str> {
        let urls: Vec<&PlayerUrl> = self
            .data
            .iter()
            .flat_map(|d| d.player_urls.iter())
            .filter(|u| !u.url.is_empty())
            .collect();

        HLS_TYPES
            .iter()
            .find_map(|kind| urls.iter().find(|u| u.kind == *kind))
            .map(|u| u.url.as_str())
    }

    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    fn into_candidate(self) -> StreamCandidate {
        if !self.is_online {
            return StreamCandidate::offline(Platform::Vk);
        }
        let playback_source = self
            .hls_url()
            .map(PlaybackSource::from_url)
            .unwrap_or_default();
        StreamCandidate {
            platform: Platform::Vk,
            online: true,
            started_at: self.started_at(),
            playback_source,
        }
    }
}

/// VK Video Live collaborator.
pub struct VkClient {
    client: reqwest::Client,
    access_token: Option<SecretString>,
}

impl VkClient {
    pub fn new(access_token: Option<SecretString>) -> Result<Self, PlatformError> {
        Ok(Self {
            client: http_client()?,
            access_token,
        })
    }
}

#[async_trait]
impl StreamPlatform for VkClient {
    fn platform(&self) -> Platform {
        Platform::Vk
    }

    async fn stream_info(&self, channel: &str) -> Result<StreamCandidate, PlatformError> {
        let url = format!("{API_BASE}/{}/public_video_stream", channel.to_lowercase());
        let mut request = self.client.get(&url);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = check_status(request.send().await?)?;
        let stream: BlogStream = response.json().await?;
        log::debug!(
            "VK stream info for {}: online={}, hls={:?}",
            channel,
            stream.is_online,
            stream.hls_url()
        );

        Ok(stream.into_candidate())
    }

    async fn playback_variants(
        &self,
        _channel: &str,
        candidate: &StreamCandidate,
    ) -> Result<Vec<PlaybackVariant>, PlatformError> {
        if !candidate.online {
            return Err(PlatformError::Offline);
        }
        let source = candidate
            .playback_source
            .url()
            .ok_or(PlatformError::NoPlaybackSource)?;
        let url = Url::parse(source).map_err(|e| PlatformError::Parse(format!("hls url {source}: {e}")))?;

        hls::fetch_master_playlist(&self.client, &url).await
    }
}
