//! Live stream watching: liveness probe, check cycle state machine and the
//! periodic trigger.
//!
//! The orchestrator is the only owner of the recorder state and the recording
//! handle. Triggers (scheduler, HTTP) only ever call `check_once`.

pub mod orchestrator;
pub mod probe;
pub mod scheduler;
pub mod state;

pub use orchestrator::{Orchestrator, RecorderSettings};
pub use probe::{ProbeResult, StreamProbe};
pub use scheduler::start_scheduler;
pub use state::{CycleOutcome, RecorderState, RecorderStatus, RecordingJob};
