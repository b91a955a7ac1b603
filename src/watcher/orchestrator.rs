//! The check cycle state machine.
//!
//! `Orchestrator` owns the recorder state and the single recording handle.
//! Every trigger (timer, HTTP, follow-up) calls `check_once`; the guard at the
//! top of a cycle is an atomic `Idle -> Probing` transition, so concurrent
//! triggers collapse into one active cycle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

use crate::core::config::RecorderConfig;
use crate::core::status::{StatusKind, StatusReporter};
use crate::core::utils::recording_path;
use crate::download::command::build_command;
use crate::download::format::{select_variant, Selection};
use crate::download::progress::{ProgressSnapshot, NOT_AVAILABLE};
use crate::download::supervisor::{ExitReport, RecordingProcess, StopHandle, StopOutcome};
use crate::watcher::probe::StreamProbe;
use crate::watcher::state::{CycleOutcome, RecorderState, RecorderStatus, RecordingJob};

const WAITING: &str = "stream offline | waiting...";

/// The part of the configuration a check cycle needs.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub output_dir: PathBuf,
    pub bin: PathBuf,
    pub template: String,
    pub format: String,
    pub ext: String,
    /// Delay before the follow-up check after a recording ends
    pub cooldown: Duration,
}

impl From<&RecorderConfig> for RecorderSettings {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            bin: config.bin.clone(),
            template: config.template.clone(),
            format: config.format.clone(),
            ext: config.ext.clone(),
            cooldown: config.cooldown,
        }
    }
}

struct ActiveRecording {
    job: RecordingJob,
    stop: StopHandle,
    progress: watch::Receiver<ProgressSnapshot>,
}

struct Inner {
    state: RecorderState,
    recording: Option<ActiveRecording>,
    last_report: Option<ExitReport>,
}

pub struct Orchestrator {
    settings: RecorderSettings,
    probe: StreamProbe,
    status: Arc<StatusReporter>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<RecorderState>,
    shutting_down: AtomicBool,
    shutdown_token: CancellationToken,
    followup: Notify,
}

impl Orchestrator {
    pub fn new(settings: RecorderSettings, probe: StreamProbe, status: Arc<StatusReporter>) -> Self {
        let (state_tx, _) = watch::channel(RecorderState::Idle);
        Self {
            settings,
            probe,
            status,
            inner: Mutex::new(Inner {
                state: RecorderState::Idle,
                recording: None,
                last_report: None,
            }),
            state_tx,
            shutting_down: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
            followup: Notify::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.lock().state
    }

    /// Observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RecorderState> {
        self.state_tx.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Cancelled once shutdown has been requested.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn status(&self) -> RecorderStatus {
        let inner = self.lock();
        RecorderStatus {
            state: inner.state,
            shutting_down: self.is_shutting_down(),
            job: inner.recording.as_ref().map(|r| r.job.clone()),
            progress: inner.recording.as_ref().map(|r| r.progress.borrow().clone()),
            last_report: inner.last_report.clone(),
            last_status: self.status.last_line(),
        }
    }

    /// Runs one check cycle. Returns `Skipped` if another cycle is active.
    pub async fn check_once(&self) -> CycleOutcome {
        if !self.try_begin() {
            log::debug!("Check skipped (state: {}, shutting down: {})", self.state(), self.is_shutting_down());
            return CycleOutcome::Skipped;
        }

        self.status.update(StatusKind::Active, "stream offline | checking...");
        let result = self.probe.probe(&self.status).await;
        if self.is_shutting_down() {
            self.transition(RecorderState::Idle);
            return CycleOutcome::Aborted;
        }

        let Some(candidate) = result.pick_live().cloned() else {
            self.transition(RecorderState::Idle);
            self.status.update(StatusKind::Waiting, WAITING);
            return CycleOutcome::Offline;
        };

        let variants = match self.probe.variants(&candidate).await {
            Ok(variants) => variants,
            Err(e) => {
                log::warn!("{} playback lookup failed: {}", candidate.platform, e);
                self.transition(RecorderState::Idle);
                self.status.update(
                    StatusKind::Error,
                    &format!("stream online | error on {} hls request", candidate.platform),
                );
                return CycleOutcome::Unavailable;
            }
        };
        if self.is_shutting_down() {
            self.transition(RecorderState::Idle);
            return CycleOutcome::Aborted;
        }

        let selection = select_variant(&variants, &self.settings.format);
        if let Selection::Fallback { chosen, ref available } = selection {
            self.status.message(
                &format!(
                    "stream has no quality {}, using {}, available formats: {}",
                    self.settings.format,
                    chosen.label,
                    available.join(", ")
                ),
                false,
            );
        }
        let Some(variant) = selection.variant().cloned() else {
            self.transition(RecorderState::Idle);
            self.status.message("stream online | stream has no playlist, stopping", false);
            return CycleOutcome::NoVariants;
        };

        let output_path = recording_path(
            &self.settings.output_dir,
            candidate.platform,
            &self.settings.ext,
            candidate.started_at,
        )
        .to_string_lossy()
        .to_string();
        let args = build_command(&self.settings.template, &variant.source_url, &output_path);

        self.status.message(
            &format!(
                "stream online | platform: {}, format: {}, dest: {}",
                candidate.platform, variant.label, output_path
            ),
            true,
        );

        let process = match RecordingProcess::start(&self.settings.bin, &args) {
            Ok(process) => process,
            Err(e) => {
                self.transition(RecorderState::Idle);
                self.status.message(&format!("downloading failed | {}", e), false);
                return CycleOutcome::SpawnFailed;
            }
        };
        log::debug!("ffmpeg started (pid: {:?})", process.id());

        let job = RecordingJob {
            platform: candidate.platform,
            variant,
            output_path,
            started_at: Utc::now(),
        };
        let progress = self.attach_recording(job, &process).await;

        let reporter = tokio::spawn(report_progress(Arc::clone(&self.status), progress));
        let report = process.wait().await;
        if let Err(e) = reporter.await {
            log::debug!("Progress reporter ended abnormally: {}", e);
        }

        {
            let mut inner = self.lock();
            inner.recording = None;
            inner.last_report = Some(report.clone());
        }
        self.status.message(&format_exit(&report), report.succeeded);

        if self.is_shutting_down() {
            self.status.message(
                &format!("app shutdown after download | code: {}", or_na(report.exit_code)),
                true,
            );
            self.transition(RecorderState::Idle);
            return CycleOutcome::Recorded(report);
        }

        self.transition(RecorderState::Idle);
        self.status.update(StatusKind::Waiting, WAITING);
        self.followup.notify_one();
        CycleOutcome::Recorded(report)
    }

    /// Requests shutdown. Only the first call has an effect.
    ///
    /// An active recording is asked to stop; this does not wait for it to exit.
    pub async fn shutdown(&self) -> bool {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shutdown_token.cancel();

        let stop = self.lock().recording.as_ref().map(|r| r.stop.clone());
        match stop {
            Some(stop) => {
                log::info!("Shutdown requested, stopping active recording");
                log_stop(stop.request_stop().await);
            }
            None => log::info!("Shutdown requested"),
        }
        true
    }

    /// Resolves once no cycle is active.
    pub async fn wait_idle(&self) {
        let mut rx = self.state_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == RecorderState::Idle).await;
    }

    /// Resolves once a recording has ended and a follow-up check is owed.
    ///
    /// A request raised while nobody waits is kept until the next call.
    pub async fn followup_requested(&self) {
        self.followup.notified().await;
    }

    /// Delay between the end of a recording and its follow-up check.
    pub fn cooldown(&self) -> Duration {
        self.settings.cooldown
    }

    /// Stores the recording handle and enters `Recording`.
    ///
    /// `shutdown()` may have looked for the handle before it was stored, so the
    /// flag is checked again afterwards and the stop is sent from here.
    async fn attach_recording(
        &self,
        job: RecordingJob,
        process: &RecordingProcess,
    ) -> watch::Receiver<ProgressSnapshot> {
        let stop = process.stop_handle();
        let progress = process.progress();
        {
            let mut inner = self.lock();
            inner.recording = Some(ActiveRecording {
                job,
                stop: stop.clone(),
                progress: progress.clone(),
            });
            inner.state = RecorderState::Recording;
            self.state_tx.send_replace(RecorderState::Recording);
        }
        if self.is_shutting_down() {
            log_stop(stop.request_stop().await);
        }
        progress
    }

    fn try_begin(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != RecorderState::Idle || self.is_shutting_down() {
            return false;
        }
        inner.state = RecorderState::Probing;
        self.state_tx.send_replace(RecorderState::Probing);
        true
    }

    fn transition(&self, state: RecorderState) {
        let mut inner = self.lock();
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn report_progress(status: Arc<StatusReporter>, mut rx: watch::Receiver<ProgressSnapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        status.progress(&snapshot);
    }
}

fn log_stop(outcome: StopOutcome) {
    match outcome {
        StopOutcome::Sent => log::info!("Stop token sent to ffmpeg"),
        StopOutcome::AlreadyClosed => log::debug!("ffmpeg stdin already closed"),
        StopOutcome::Failed(e) => log::warn!("Could not send stop token: {}", e),
    }
}

fn or_na(value: Option<i32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

fn format_exit(report: &ExitReport) -> String {
    format!(
        "downloading stopped | status: {}, code: {}, size: {}, duration: {}, signal: {}",
        if report.succeeded { "ok" } else { "failed" },
        or_na(report.exit_code),
        report.progress.size,
        report.progress.time,
        or_na(report.signal)
    )
}
