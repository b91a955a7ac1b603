//! TwitchClient: liveness through Twitch's public GQL endpoint, variants through usher.
//!
//! Flow:
//! 1. `user(login).stream { id createdAt }` on `gql.twitch.tv`; a null stream means offline
//! 2. `streamPlaybackAccessToken` for the channel (value + signature)
//! 3. usher master playlist signed with that token, parsed by `hls`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::platform::{
    check_status, hls, http_client, PlatformError, PlaybackSource, PlaybackVariant, Platform, StreamCandidate,
    StreamPlatform,
};

const GQL_URL: &str = "https://gql.twitch.tv/gql";
const USHER_URL: &str = "https://usher.ttvnw.net/api/channel/hls";
/// Client id of the Twitch web player, accepted for anonymous GQL queries.
const WEB_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

const STREAM_QUERY: &str = "query StreamInfo($login: String!) { user(login: $login) { stream { id createdAt } } }";
const TOKEN_QUERY: &str = "query PlaybackAccessToken($login: String!) { streamPlaybackAccessToken(channelName: $login, params: {platform: \"web\", playerBackend: \"mediaplayer\", playerType: \"site\"}) { value signature } }";

#[derive(Debug, Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    stream: Option<Stream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stream {
    #[allow(dead_code)]
    id: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    stream_playback_access_token: Option<AccessToken>,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    value: String,
    signature: String,
}

/// Twitch collaborator.
pub struct TwitchClient {
    client: reqwest::Client,
    device_id: Option<String>,
}

impl TwitchClient {
    pub fn new(device_id: Option<String>) -> Result<Self, PlatformError> {
        Ok(Self {
            client: http_client()?,
            device_id: device_id.filter(|d| !d.is_empty()),
        })
    }

    async fn gql<T: for<'de> Deserialize<'de>>(&self, query: &str, login: &str) -> Result<T, PlatformError> {
        let mut request = self
            .client
            .post(GQL_URL)
            .header("Client-ID", WEB_CLIENT_ID)
            .json(&json!({ "query": query, "variables": { "login": login } }));
        if let Some(ref device_id) = self.device_id {
            request = request.header("X-Device-Id", device_id);
        }

        let response = check_status(request.send().await?)?;
        let body: GqlResponse<T> = response.json().await?;
        body.data.ok_or_else(|| PlatformError::Parse("GQL response without data".to_string()))
    }

    fn usher_url(login: &str, token: &AccessToken) -> Result<Url, PlatformError> {
        let player_id = rand::thread_rng().gen_range(1_000_000..10_000_000).to_string();
        Url::parse_with_params(
            &format!("{USHER_URL}/{login}.m3u8"),
            &[
                ("sig", token.signature.as_str()),
                ("token", token.value.as_str()),
                ("allow_source", "true"),
                ("allow_audio_only", "true"),
                ("fast_bread", "true"),
                ("playlist_include_framerate", "true"),
                ("player_backend", "mediaplayer"),
                ("p", player_id.as_str()),
            ],
        )
        .map_err(|e| PlatformError::Parse(format!("usher url: {e}")))
    }
}

#[async_trait]
impl StreamPlatform for TwitchClient {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn stream_info(&self, channel: &str) -> Result<StreamCandidate, PlatformError> {
        let login = channel.to_lowercase();
        let data: UserData = self.gql(STREAM_QUERY, &login).await?;

        let stream = data.user.and_then(|u| u.stream);
        log::debug!("Twitch stream info for {}: {:?}", login, stream);

        Ok(match stream {
            Some(stream) => StreamCandidate {
                platform: Platform::Twitch,
                online: true,
                started_at: stream.created_at,
                playback_source: PlaybackSource::none(),
            },
            None => StreamCandidate::offline(Platform::Twitch),
        })
    }

    async fn playback_variants(
        &self,
        channel: &str,
        candidate: &StreamCandidate,
    ) -> Result<Vec<PlaybackVariant>, PlatformError> {
        if !candidate.online {
            return Err(PlatformError::Offline);
        }

        let login = channel.to_lowercase();
        let data: TokenData = self.gql(TOKEN_QUERY, &login).await?;
        let token = data
            .stream_playback_access_token
            .ok_or_else(|| PlatformError::Parse("missing playback access token".to_string()))?;

        let url = Self::usher_url(&login, &token)?;
        hls::fetch_master_playlist(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_live_stream_response() {
        let body = r#"{"data":{"user":{"stream":{"id":"4242","createdAt":"2026-10-14T10:00:00Z"}}}}"#;
        let parsed: GqlResponse<UserData> = serde_json::from_str(body).unwrap();
        let stream = parsed.data.unwrap().user.unwrap().stream.unwrap();
        assert_eq!(stream.created_at.unwrap().to_rfc3339(), "2026-10-14T10:00:00+00:00");
    }

    #[test]
    fn test_parses_offline_and_unknown_user() {
        let offline: GqlResponse<UserData> =
            serde_json::from_str(r#"{"data":{"user":{"stream":null}}}"#).unwrap();
        assert!(offline.data.unwrap().user.unwrap().stream.is_none());

        let unknown: GqlResponse<UserData> = serde_json::from_str(r#"{"data":{"user":null}}"#).unwrap();
        assert!(unknown.data.unwrap().user.is_none());
    }

    #[test]
    fn test_usher_url_carries_token() {
        let token = AccessToken {
            value: "{\"channel\":\"x\"}".to_string(),
            signature: "abc123".to_string(),
        };
        let url = TwitchClient::usher_url("somechannel", &token).unwrap();
        assert_eq!(url.path(), "/api/channel/hls/somechannel.m3u8");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("sig".to_string(), "abc123".to_string())));
        assert!(pairs.contains(&("token".to_string(), "{\"channel\":\"x\"}".to_string())));
        assert!(pairs.contains(&("allow_source".to_string(), "true".to_string())));
    }
}
