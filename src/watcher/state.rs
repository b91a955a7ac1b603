use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::download::progress::ProgressSnapshot;
use crate::download::supervisor::ExitReport;
use crate::platform::{Platform, PlaybackVariant};

/// Recorder lifecycle: `Idle -> Probing -> (Recording ->) Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No probe in flight, no recording
    Idle,
    /// A liveness / format check is in progress
    Probing,
    /// An ffmpeg child process is active
    Recording,
}

/// The recording in progress.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingJob {
    pub platform: Platform,
    pub variant: PlaybackVariant,
    pub output_path: String,
    pub started_at: DateTime<Utc>,
}

/// How a `check_once` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was active, or shutdown was requested
    Skipped,
    /// Shutdown arrived while probing; the result was discarded
    Aborted,
    /// Neither platform is live
    Offline,
    /// Live, but the playback variants could not be fetched
    Unavailable,
    /// Live, but the stream offered no variants
    NoVariants,
    /// ffmpeg could not be started
    SpawnFailed,
    /// A recording ran and exited
    Recorded(ExitReport),
}

/// Read-only snapshot served by the `/status` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub state: RecorderState,
    pub shutting_down: bool,
    pub job: Option<RecordingJob>,
    pub progress: Option<ProgressSnapshot>,
    pub last_report: Option<ExitReport>,
    pub last_status: String,
}
