//! Attendance verification: code generation, student submission with fraud heuristics,
//! lecturer review and attendance statistics.

pub mod code;
pub mod heuristics;
pub mod network;
mod review;
mod session;
mod stats;
mod submission;

use std::sync::Arc;

use common::config::Config;

use crate::clock::{Clock, SystemClock};
use crate::policy::AttendanceDefaults;

pub use code::{CodeSource, OsCodeSource};
pub use review::ReviewAction;
pub use session::GeneratedCode;
pub use stats::{SessionAttendance, SessionStats, SessionSummary, StudentAttendanceStats};
pub use submission::{SubmissionOutcome, SubmissionRequest, FLAGGED_NOTE};

pub struct AttendanceEngine {
    defaults: AttendanceDefaults,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeSource>,
}

impl AttendanceEngine {
    pub fn new(
        defaults: AttendanceDefaults,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeSource>,
    ) -> Self {
        Self { defaults, clock, codes }
    }

    /// Engine with the system clock and OS randomness.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.into(), Arc::new(SystemClock), Arc::new(OsCodeSource))
    }

    pub fn defaults(&self) -> &AttendanceDefaults {
        &self.defaults
    }
}
