//! ffmpeg `-stats` output parsing.
//!
//! ffmpeg reports progress on stderr as free text, e.g.
//! `frame= 1234 fps= 30 q=-1.0 size=   10240kB time=00:00:41.00 bitrate=2046.0kbits/s speed=1.0x`.
//! Everything else on that stream is chatter and is ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Value shown for a field that ffmpeg has not reported yet.
pub const NOT_AVAILABLE: &str = "N/A";

/// Lines at most this long that start with a noise marker are dropped unparsed.
const SHORT_LINE_MAX_LEN: usize = 20;

/// First bytes of the short partial lines ffmpeg emits between stat updates.
const SHORT_LINE_MARKERS: [u8; 2] = [b's', b'f'];

static STATS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"size=\s*(\S+)\s+time=\s*(\S+)\s+bitrate=\s*(\S+)").expect("stats regex is valid")
});

/// Latest progress reported by the recording process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Output size so far, as printed by ffmpeg (e.g. `1024kB`)
    pub size: String,
    /// Recorded media time (e.g. `00:00:10.00`)
    pub time: String,
    /// Current bitrate (e.g. `800.0kbits/s`)
    pub bitrate: String,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            size: NOT_AVAILABLE.to_string(),
            time: NOT_AVAILABLE.to_string(),
            bitrate: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Incremental parser owning the snapshot it updates.
#[derive(Debug, Default)]
pub struct ProgressParser {
    snapshot: ProgressSnapshot,
    ticks: u64,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line. Returns `true` when the line was a stats line and the snapshot changed.
    pub fn feed(&mut self, line: &[u8]) -> bool {
        if is_noise(line) {
            return false;
        }

        let text = String::from_utf8_lossy(line);
        let Some(caps) = STATS_REGEX.captures(&text) else {
            return false;
        };

        self.snapshot.size = caps[1].to_string();
        self.snapshot.time = caps[2].to_string();
        self.snapshot.bitrate = caps[3].to_string();
        self.ticks += 1;

        log::trace!(
            "ffmpeg progress: size={} time={} bitrate={}",
            self.snapshot.size,
            self.snapshot.time,
            self.snapshot.bitrate
        );
        true
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    /// Number of stats lines accepted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn into_snapshot(self) -> ProgressSnapshot {
        self.snapshot
    }
}

fn is_noise(line: &[u8]) -> bool {
    line.len() <= SHORT_LINE_MAX_LEN && line.first().is_some_and(|b| SHORT_LINE_MARKERS.contains(b))
}
