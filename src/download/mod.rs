//! Recording: ffmpeg command construction, quality selection and process supervision

pub mod command;
pub mod format;
pub mod progress;
pub mod supervisor;

// Re-exports for convenience
pub use command::{build_command, validate_template};
pub use format::{select_variant, Selection};
pub use progress::{ProgressParser, ProgressSnapshot};
pub use supervisor::{ExitReport, RecordingProcess, StopHandle, StopOutcome};
