//! HLS master playlist parsing shared by the platform clients.

use url::Url;

use crate::platform::{check_status, PlatformError, PlaybackVariant};

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const MEDIA: &str = "#EXT-X-MEDIA:";

/// Downloads and parses a master playlist.
pub(crate) async fn fetch_master_playlist(
    client: &reqwest::Client,
    url: &Url,
) -> Result<Vec<PlaybackVariant>, PlatformError> {
    let response = check_status(client.get(url.clone()).send().await?)?;
    let body = response.text().await?;
    parse_master_playlist(&body, url)
}

/// Parses `#EXT-X-STREAM-INF` entries in playlist order.
///
/// The label comes from the matching `#EXT-X-MEDIA` `NAME` (with a ` (source)`
/// suffix dropped), then the `VIDEO` group id, then `<height>p<fps>` derived
/// from `RESOLUTION`/`FRAME-RATE`, and finally `audio_only`.
pub fn parse_master_playlist(body: &str, base: &Url) -> Result<Vec<PlaybackVariant>, PlatformError> {
    if !body.trim_start().starts_with("#EXTM3U") {
        return Err(PlatformError::Parse("not an m3u8 playlist".to_string()));
    }

    let mut media_names: Vec<(String, String)> = Vec::new();
    let mut variants = Vec::new();
    let mut pending: Option<Vec<(String, String)>> = None;

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(attrs) = line.strip_prefix(MEDIA) {
            let attrs = parse_attributes(attrs);
            if attr(&attrs, "TYPE") == Some("VIDEO") {
                if let (Some(group), Some(name)) = (attr(&attrs, "GROUP-ID"), attr(&attrs, "NAME")) {
                    media_names.push((group.to_string(), name.to_string()));
                }
            }
        } else if let Some(attrs) = line.strip_prefix(STREAM_INF) {
            pending = Some(parse_attributes(attrs));
        } else if line.starts_with('#') {
            continue;
        } else if let Some(attrs) = pending.take() {
            let source_url = base
                .join(line)
                .map_err(|e| PlatformError::Parse(format!("bad variant uri {line}: {e}")))?;
            let resolution = attr(&attrs, "RESOLUTION").map(str::to_string);
            variants.push(PlaybackVariant {
                label: variant_label(&attrs, &media_names),
                resolution,
                source_url: source_url.to_string(),
            });
        }
    }

    Ok(variants)
}

fn variant_label(attrs: &[(String, String)], media_names: &[(String, String)]) -> String {
    let group = attr(attrs, "VIDEO");

    if let Some(group) = group {
        if let Some((_, name)) = media_names.iter().find(|(g, _)| g == group) {
            return name.trim_end_matches(" (source)").to_string();
        }
    }

    if let Some(name) = attr(attrs, "NAME") {
        return name.trim_end_matches(" (source)").to_string();
    }

    if let Some(group) = group.filter(|g| g.chars().next().is_some_and(|c| c.is_ascii_digit())) {
        return group.to_string();
    }

    if let Some(height) = attr(attrs, "RESOLUTION").and_then(|r| r.split('x').nth(1)) {
        let fps = attr(attrs, "FRAME-RATE")
            .and_then(|f| f.parse::<f64>().ok())
            .map(|f| f.round() as u32)
            .filter(|f| *f > 30)
            .map(|f| f.to_string())
            .unwrap_or_default();
        return format!("{height}p{fps}");
    }

    group.map(str::to_string).unwrap_or_else(|| "audio_only".to_string())
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Splits `KEY=VALUE,KEY="quoted,value"` attribute lists.
fn parse_attributes(input: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '=' if !in_value && !in_quotes => in_value = true,
            ',' if !in_quotes => {
                if !key.is_empty() {
                    out.push((key.trim().to_string(), std::mem::take(&mut value)));
                }
                key.clear();
                value.clear();
                in_value = false;
            }
            c if in_value => value.push(c),
            c => key.push(c),
        }
    }
    if !key.is_empty() {
        out.push((key.trim().to_string(), value));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWITCH_MASTER: &str = r#"#EXTM3U
#EXT-X-TWITCH-INFO:NODE="video-edge-1",MANIFEST-NODE-TYPE="weaver_cluster"
#EXT-X-MEDIA:TYPE=VIDEO,GROUP-ID="chunked",NAME="1080p60 (source)",AUTOSELECT=YES,DEFAULT=YES
#EXT-X-STREAM-INF:BANDWIDTH=8534030,RESOLUTION=1920x1080,CODECS="avc1.64002A,mp4a.40.2",VIDEO="chunked",FRAME-RATE=60.000
https://video-weaver.example/v1/playlist/source.m3u8
#EXT-X-MEDIA:TYPE=VIDEO,GROUP-ID="720p30",NAME="720p",AUTOSELECT=YES,DEFAULT=YES
#EXT-X-STREAM-INF:BANDWIDTH=2373000,RESOLUTION=1280x720,CODECS="avc1.4D401F,mp4a.40.2",VIDEO="720p30",FRAME-RATE=30.000
https://video-weaver.example/v1/playlist/720.m3u8
#EXT-X-MEDIA:TYPE=VIDEO,GROUP-ID="audio_only",NAME="audio_only",AUTOSELECT=NO,DEFAULT=NO
#EXT-X-STREAM-INF:BANDWIDTH=160000,CODECS="mp4a.40.2",VIDEO="audio_only"
https://video-weaver.example/v1/playlist/audio.m3u8
"#;

    fn base() -> Url {
        Url::parse("https://usher.example/api/channel/hls/chan.m3u8").unwrap()
    }

    #[test]
    fn test_parses_twitch_style_master() {
        let variants = parse_master_playlist(TWITCH_MASTER, &base()).unwrap();
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["1080p60", "720p", "audio_only"]);
        assert_eq!(variants[0].resolution.as_deref(), Some("1920x1080"));
        assert_eq!(variants[0].source_url, "https://video-weaver.example/v1/playlist/source.m3u8");
        assert_eq!(variants[2].resolution, None);
    }

    #[test]
    fn test_relative_uris_resolve_against_base() {
        let body = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=854x480\n480/index.m3u8\n";
        let variants = parse_master_playlist(body, &base()).unwrap();
        assert_eq!(variants[0].source_url, "https://usher.example/api/channel/hls/480/index.m3u8");
        assert_eq!(variants[0].label, "480p");
    }

    #[test]
    fn test_label_from_resolution_and_frame_rate() {
        let body = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=1920x1080,FRAME-RATE=59.940\nhi.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=1\naudio.m3u8\n";
        let variants = parse_master_playlist(body, &base()).unwrap();
        assert_eq!(variants[0].label, "1080p60");
        assert_eq!(variants[1].label, "audio_only");
    }

    #[test]
    fn test_rejects_non_playlist() {
        assert!(matches!(
            parse_master_playlist("<html>nope</html>", &base()),
            Err(PlatformError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_master_yields_no_variants() {
        assert!(parse_master_playlist("#EXTM3U\n", &base()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_attributes_keeps_quoted_commas() {
        let attrs = parse_attributes(r#"BANDWIDTH=1,CODECS="avc1.64002A,mp4a.40.2",VIDEO="chunked""#);
        assert_eq!(attr(&attrs, "CODECS"), Some("avc1.64002A,mp4a.40.2"));
        assert_eq!(attr(&attrs, "VIDEO"), Some("chunked"));
        assert_eq!(attr(&attrs, "BANDWIDTH"), Some("1"));
    }
}
