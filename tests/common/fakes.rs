//! In-memory platform and notifier doubles.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use livegrab::core::error::AppResult;
use livegrab::core::StatusReporter;
use livegrab::platform::{Platform, PlatformError, PlaybackSource, PlaybackVariant, StreamCandidate, StreamPlatform};
use livegrab::telegram::Notifier;
use livegrab::watcher::{Orchestrator, RecorderSettings, RecorderState, StreamProbe};

pub fn variant(label: &str, source_url: &str) -> PlaybackVariant {
    PlaybackVariant {
        label: label.to_string(),
        resolution: None,
        source_url: source_url.to_string(),
    }
}

/// A platform with canned answers.
pub struct FakePlatform {
    platform: Platform,
    live: bool,
    fail_lookup: bool,
    /// `None` makes the variant lookup fail
    variants: Option<Vec<PlaybackVariant>>,
    gate: Option<Arc<Semaphore>>,
    pub lookups: AtomicUsize,
    pub variant_lookups: AtomicUsize,
}

impl FakePlatform {
    pub fn offline(platform: Platform) -> Self {
        Self {
            platform,
            live: false,
            fail_lookup: false,
            variants: Some(Vec::new()),
            gate: None,
            lookups: AtomicUsize::new(0),
            variant_lookups: AtomicUsize::new(0),
        }
    }

    pub fn live(platform: Platform, variants: Vec<PlaybackVariant>) -> Self {
        Self {
            live: true,
            variants: Some(variants),
            ..Self::offline(platform)
        }
    }

    pub fn failing(platform: Platform) -> Self {
        Self {
            fail_lookup: true,
            ..Self::offline(platform)
        }
    }

    /// Live, but the playlist request fails.
    pub fn without_playlist(platform: Platform) -> Self {
        Self {
            live: true,
            variants: None,
            ..Self::offline(platform)
        }
    }

    /// `stream_info` blocks until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamPlatform for FakePlatform {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn stream_info(&self, _channel: &str) -> Result<StreamCandidate, PlatformError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            let _permit = gate.acquire().await.map_err(|e| PlatformError::Parse(e.to_string()))?;
        }
        if self.fail_lookup {
            return Err(PlatformError::Parse("canned failure".to_string()));
        }
        Ok(StreamCandidate {
            platform: self.platform,
            online: self.live,
            started_at: self.live.then(|| Utc::now() - chrono::Duration::seconds(42)),
            playback_source: PlaybackSource::none(),
        })
    }

    async fn playback_variants(
        &self,
        _channel: &str,
        _candidate: &StreamCandidate,
    ) -> Result<Vec<PlaybackVariant>, PlatformError> {
        self.variant_lookups.fetch_add(1, Ordering::SeqCst);
        self.variants.clone().ok_or(PlatformError::NoPlaybackSource)
    }
}

/// Collects every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits until at least `count` notifications arrived (they are delivered in the background).
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let sent = self.messages();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn settings(output_dir: &Path, bin: &Path, template: &str, format: &str) -> RecorderSettings {
    RecorderSettings {
        output_dir: output_dir.to_path_buf(),
        bin: bin.to_path_buf(),
        template: template.to_string(),
        format: format.to_string(),
        ext: "mp4".to_string(),
        cooldown: Duration::from_millis(20),
    }
}

pub struct TestRecorder {
    pub orchestrator: Arc<Orchestrator>,
    pub primary: Arc<FakePlatform>,
    pub secondary: Arc<FakePlatform>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn build_orchestrator(primary: FakePlatform, secondary: FakePlatform, settings: RecorderSettings) -> TestRecorder {
    let primary = Arc::new(primary);
    let secondary = Arc::new(secondary);
    let notifier = Arc::new(RecordingNotifier::default());
    let probe = StreamProbe::new(primary.clone(), secondary.clone(), "welovegames");
    let status = Arc::new(StatusReporter::new(notifier.clone()));
    TestRecorder {
        orchestrator: Arc::new(Orchestrator::new(settings, probe, status)),
        primary,
        secondary,
        notifier,
    }
}

pub async fn wait_for_state(orchestrator: &Orchestrator, state: RecorderState) {
    let mut rx = orchestrator.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}
