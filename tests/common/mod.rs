//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fakes;

#[allow(unused_imports)]
pub use fakes::{
    build_orchestrator, settings, variant, wait_for_state, FakePlatform, RecordingNotifier, TestRecorder,
};
