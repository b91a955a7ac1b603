use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::platform::Platform;

/// Local timestamp in the filename-safe form used by status lines and recordings.
///
/// # Example
///
/// ```
/// use chrono::TimeZone;
/// use livegrab::core::utils::date_string;
///
/// let at = chrono::Local.with_ymd_and_hms(2026, 10, 14, 9, 5, 3).unwrap();
/// assert_eq!(date_string(&at), "2026-10-14T09-05-03");
/// ```
pub fn date_string(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Current local time as `date_string`.
pub fn now_string() -> String {
    date_string(&Local::now())
}

/// Builds `<platform>_<timestamp>_<elapsed>.<ext>`.
///
/// `elapsed` is the number of whole seconds the broadcast had been running when the
/// recording started (0 when the start time is unknown or in the future).
pub fn recording_file_name(
    platform: Platform,
    ext: &str,
    now: DateTime<Utc>,
    stream_started_at: Option<DateTime<Utc>>,
) -> String {
    let elapsed_ms = stream_started_at
        .map(|started| (now - started).num_milliseconds())
        .unwrap_or(0)
        .max(0);
    let elapsed_secs = (elapsed_ms + 500) / 1000;
    let local: DateTime<Local> = now.with_timezone(&Local);

    format!("{}_{}_{}.{}", platform, date_string(&local), elapsed_secs, ext)
}

/// Full output path for a new recording in `dir`.
pub fn recording_path(
    dir: &Path,
    platform: Platform,
    ext: &str,
    stream_started_at: Option<DateTime<Utc>>,
) -> PathBuf {
    dir.join(recording_file_name(platform, ext, Utc::now(), stream_started_at))
}

/// Escapes text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_name_includes_elapsed_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        let started = now - Duration::milliseconds(754_600);
        let name = recording_file_name(Platform::Twitch, "mp4", now, Some(started));

        let local = date_string(&now.with_timezone(&Local));
        assert_eq!(name, format!("twitch_{local}_755.mp4"));
    }

    #[test]
    fn test_file_name_without_start_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        let name = recording_file_name(Platform::Vk, "mkv", now, None);
        assert!(name.starts_with("vk_"));
        assert!(name.ends_with("_0.mkv"));
    }

    #[test]
    fn test_future_start_time_clamps_to_zero() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        let name = recording_file_name(Platform::Vk, "mp4", now, Some(now + Duration::seconds(30)));
        assert!(name.ends_with("_0.mp4"));
    }

    #[test]
    fn test_recording_path_is_inside_dir() {
        let path = recording_path(Path::new("/records"), Platform::Twitch, "mp4", None);
        assert_eq!(path.parent(), Some(Path::new("/records")));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }
}
