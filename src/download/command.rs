//! ffmpeg command line rendering.
//!
//! A template is a plain string such as
//! `-loglevel fatal -stats -i {url} -c copy {file}`. At record time the two
//! placeholders are substituted and the result is split into an argument vector.
//! Double-quoted runs stay inside one argument, so values with spaces
//! (user agents, filter graphs) survive the split.

use crate::core::config::ConfigError;

/// Placeholder replaced by the playback URL.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Placeholder replaced by the output file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Built-in command templates.
pub mod presets {
    /// Stream copy of audio and video into the output container.
    pub const VIDEO_COPY: &str = "-loglevel fatal -stats -timeout 15000000 -reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 3 -reconnect_max_retries 10 -user_agent \"Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36\" -seg_max_retry 5 -i {url} -c copy {file}";

    /// First audio stream only, copied as is.
    pub const AUDIO_COPY: &str = "-loglevel fatal -stats -timeout 15000000 -reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 3 -reconnect_max_retries 10 -i {url} -seg_max_retry 5 -map 0:a:0 -c:a copy -copyts {file}";

    /// First audio stream re-encoded to AAC with regenerated timestamps.
    pub const AUDIO_TRANSCODE: &str = "-loglevel fatal -stats -timeout 15000000 -reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 3 -reconnect_max_retries 10 -i {url} -seg_max_retry 5 -map 0:a:0 -af asetpts=PTS-STARTPTS -c:a aac -q:a 5 -avoid_negative_ts make_zero -fflags +genpts {file}";
}

/// Checks that a template carries both placeholders.
///
/// Called once during startup validation; a failure here is fatal.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    for placeholder in [URL_PLACEHOLDER, FILE_PLACEHOLDER] {
        if !template.contains(placeholder) {
            return Err(ConfigError::InvalidTemplate { missing: placeholder });
        }
    }
    Ok(())
}

/// Renders `template` into an argument vector for the given source and destination.
pub fn build_command(template: &str, url: &str, output_path: &str) -> Vec<String> {
    let rendered = template
        .replace(URL_PLACEHOLDER, url)
        .replace(FILE_PLACEHOLDER, output_path);
    tokenize(&rendered)
}

/// Splits on whitespace, keeping double-quoted runs (quotes stripped) inside one argument.
fn tokenize(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    // Set once the current argument has started, so `""` yields an empty argument.
    let mut in_arg = false;
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_arg = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if in_arg {
        args.push(current);
    }

    args
}
