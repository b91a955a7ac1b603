//! Startup configuration, validated once before any check cycle runs.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::cli::Cli;
use crate::download::command::validate_template;

/// Fatal startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("channel name is empty")]
    EmptyChannel,

    #[error("ffmpeg not found at {}", .0.display())]
    MissingBinary(PathBuf),

    #[error("output directory {} not exists", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("ffmpeg command is not valid, {missing} not found in template")]
    InvalidTemplate { missing: &'static str },

    #[error("--ip and --port must be given together")]
    IncompleteTriggerAddress,

    #[error("invalid trigger address {0}")]
    InvalidTriggerAddress(String),

    #[error("trigger server needs a shared secret (--trigger-secret / TRIGGER_SECRET)")]
    MissingTriggerSecret,

    #[error("telegram chat id must be numeric or @channel, got {0}")]
    InvalidChatId(String),

    #[error("poll interval must be at least one second")]
    InvalidPollInterval,
}

/// Where Telegram notifications go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.starts_with('@') && raw.len() > 1 {
            return Ok(ChatTarget::Username(raw.to_string()));
        }
        raw.parse::<i64>()
            .map(ChatTarget::Id)
            .map_err(|_| ConfigError::InvalidChatId(raw.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: SecretString,
    pub chat: ChatTarget,
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub addr: SocketAddr,
    pub header: String,
    pub secret: SecretString,
}

/// Validated recorder configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub channel: String,
    pub output_dir: PathBuf,
    pub bin: PathBuf,
    pub template: String,
    pub format: String,
    pub ext: String,
    pub device_id: Option<String>,
    pub vk_token: Option<SecretString>,
    pub telegram: Option<TelegramConfig>,
    pub trigger: Option<TriggerConfig>,
    pub http_delay: Duration,
    pub poll_interval: Duration,
    pub cooldown: Duration,
}

impl RecorderConfig {
    /// Builds and validates the configuration. `cwd` anchors relative paths.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self, ConfigError> {
        let channel = cli.channel.trim().to_string();
        if channel.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }

        let output_dir = match cli.dir {
            Some(ref dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };
        if !output_dir.is_dir() {
            return Err(ConfigError::MissingOutputDir(output_dir));
        }

        let bin = resolve_binary(cli.bin.as_deref(), cwd);
        if must_exist_on_disk(&bin) && !bin.is_file() {
            return Err(ConfigError::MissingBinary(bin));
        }

        let template = cli
            .template
            .clone()
            .unwrap_or_else(|| cli.preset.template().to_string());
        validate_template(&template)?;

        if cli.poll_interval == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        let trigger = match (cli.ip.as_deref(), cli.port) {
            (Some(ip), Some(port)) => {
                let addr = format!("{ip}:{port}");
                let addr: SocketAddr = addr
                    .parse()
                    .map_err(|_| ConfigError::InvalidTriggerAddress(addr.clone()))?;
                let secret = non_empty(cli.trigger_secret.as_deref()).ok_or(ConfigError::MissingTriggerSecret)?;
                Some(TriggerConfig {
                    addr,
                    header: cli.trigger_header.clone(),
                    secret: SecretString::from(secret),
                })
            }
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTriggerAddress),
        };

        let telegram = match (non_empty(cli.tg_token.as_deref()), non_empty(cli.tg_id.as_deref())) {
            (Some(token), Some(chat)) => Some(TelegramConfig {
                token: SecretString::from(token),
                chat: ChatTarget::parse(&chat)?,
            }),
            (None, None) => None,
            _ => {
                log::warn!("Telegram notifications disabled: both TELEGRAM_TOKEN and TELEGRAM_CHAT_ID are needed");
                None
            }
        };

        Ok(Self {
            channel,
            output_dir,
            bin,
            template,
            format: cli.format.clone(),
            ext: cli.ext.trim_start_matches('.').to_string(),
            device_id: non_empty(cli.device_id.as_deref()),
            vk_token: non_empty(cli.vk_token.as_deref()).map(SecretString::from),
            telegram,
            trigger,
            http_delay: Duration::from_millis(cli.http_delay),
            poll_interval: Duration::from_secs(cli.poll_interval),
            cooldown: Duration::from_millis(cli.cooldown),
        })
    }

    /// Logs the effective settings at startup, secrets masked.
    pub fn log_summary(&self) {
        let masked = |set: bool| if set { "***" } else { "null" };
        let rows: Vec<(&str, String)> = vec![
            ("channel", self.channel.clone()),
            ("dir", self.output_dir.display().to_string()),
            ("bin", self.bin.display().to_string()),
            ("ffmpeg", self.template.clone()),
            ("format", self.format.clone()),
            ("ext", self.ext.clone()),
            ("os", std::env::consts::OS.to_string()),
            ("device_id", self.device_id.clone().unwrap_or_else(|| "null".to_string())),
            ("vk_token", masked(self.vk_token.is_some()).to_string()),
            ("tg_token", masked(self.telegram.is_some()).to_string()),
            (
                "tg_id",
                match self.telegram.as_ref().map(|t| &t.chat) {
                    Some(ChatTarget::Id(id)) => id.to_string(),
                    Some(ChatTarget::Username(name)) => name.clone(),
                    None => "null".to_string(),
                },
            ),
            (
                "trigger",
                self.trigger
                    .as_ref()
                    .map(|t| format!("http://{} ({})", t.addr, t.header))
                    .unwrap_or_else(|| "null".to_string()),
            ),
            ("http_delay", format!("{}ms", self.http_delay.as_millis())),
            ("interval", format!("{}s", self.poll_interval.as_secs())),
            ("cooldown", format!("{}ms", self.cooldown.as_millis())),
        ];

        for (key, value) in rows {
            log::info!("{:>12} | {}", key, value);
        }
    }
}

fn resolve_binary(bin: Option<&Path>, cwd: &Path) -> PathBuf {
    match bin {
        Some(bin) => bin.to_path_buf(),
        None if cfg!(windows) => cwd.join("ffmpeg.exe"),
        None => PathBuf::from("ffmpeg"),
    }
}

/// Bare names are looked up on PATH at spawn time; anything path-like must exist now.
fn must_exist_on_disk(bin: &Path) -> bool {
    cfg!(windows) || bin.is_absolute() || bin.components().count() > 1
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
