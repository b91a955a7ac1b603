use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::download::command::presets;

#[derive(Parser, Debug, Clone)]
#[command(name = "livegrab")]
#[command(
    author,
    version,
    about = "Watches a Twitch / VK Video Live channel and records live broadcasts with ffmpeg",
    long_about = None
)]
pub struct Cli {
    /// Channel name, shared by both platforms
    #[arg(long, env = "LIVEGRAB_CHANNEL", default_value = "welovegames")]
    pub channel: String,

    /// Output directory (relative paths are resolved against the working directory)
    #[arg(long, env = "LIVEGRAB_DIR")]
    pub dir: Option<PathBuf>,

    /// ffmpeg binary
    #[arg(long, env = "FFMPEG_BIN")]
    pub bin: Option<PathBuf>,

    /// ffmpeg argument template; must contain {url} and {file}. Overrides --preset
    #[arg(long = "ffmpeg", env = "FFMPEG_TEMPLATE")]
    pub template: Option<String>,

    /// Built-in argument template used when --ffmpeg is not given
    #[arg(long, value_enum, default_value_t = Preset::VideoCopy)]
    pub preset: Preset,

    /// Desired quality, e.g. 1080p60 or 720p
    #[arg(long, env = "LIVEGRAB_FORMAT", default_value = "1080p60")]
    pub format: String,

    /// Output file extension
    #[arg(long, default_value = "mp4")]
    pub ext: String,

    /// Twitch device id sent with GQL requests
    #[arg(long, env = "DEVICE_ID")]
    pub device_id: Option<String>,

    /// VK Video Live access token
    #[arg(long, env = "VK_TOKEN", hide_env_values = true)]
    pub vk_token: Option<String>,

    /// Telegram bot token for notifications
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub tg_token: Option<String>,

    /// Telegram chat id (numeric) or @channel to notify
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub tg_id: Option<String>,

    /// Trigger server bind address (requires --port)
    #[arg(long)]
    pub ip: Option<String>,

    /// Trigger server port (requires --ip)
    #[arg(long)]
    pub port: Option<u16>,

    /// Shared secret expected in the trigger header
    #[arg(long, env = "TRIGGER_SECRET", hide_env_values = true)]
    pub trigger_secret: Option<String>,

    /// Header carrying the trigger secret
    #[arg(long, default_value = "X-WLG-Corp")]
    pub trigger_header: String,

    /// Delay before an HTTP-triggered check, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub http_delay: u64,

    /// Interval between scheduled checks, in seconds
    #[arg(long, default_value_t = 120)]
    pub poll_interval: u64,

    /// Delay before re-checking after a recording ends, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub cooldown: u64,

    /// Also write logs to this file
    #[arg(long, env = "LOG_FILE_PATH")]
    pub log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Built-in ffmpeg templates.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Copy audio and video as is
    VideoCopy,
    /// Copy the first audio stream only
    AudioCopy,
    /// Re-encode the first audio stream to AAC
    AudioTranscode,
}

impl Preset {
    pub fn template(self) -> &'static str {
        match self {
            Preset::VideoCopy => presets::VIDEO_COPY,
            Preset::AudioCopy => presets::AUDIO_COPY,
            Preset::AudioTranscode => presets::AUDIO_TRANSCODE,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["livegrab"]).unwrap();
        assert_eq!(cli.format, "1080p60");
        assert_eq!(cli.ext, "mp4");
        assert_eq!(cli.preset, Preset::VideoCopy);
        assert_eq!(cli.trigger_header, "X-WLG-Corp");
        assert_eq!(cli.http_delay, 500);
        assert_eq!(cli.poll_interval, 120);
        assert_eq!(cli.cooldown, 1000);
    }

    #[test]
    fn test_preset_flag() {
        let cli = Cli::try_parse_from(["livegrab", "--preset", "audio-transcode", "--port", "8080"]).unwrap();
        assert_eq!(cli.preset, Preset::AudioTranscode);
        assert_eq!(cli.port, Some(8080));
        assert!(cli.preset.template().contains("-c:a aac"));
    }
}
