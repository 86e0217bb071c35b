//! Attendance thresholds. Defaults come from process configuration; a course may override
//! the code lifetime and its campus ranges.

use chrono::Duration;
use common::config::Config;
use db::models::course;

/// Used when neither the course nor the configuration gives a positive code lifetime.
pub const DEFAULT_CODE_VALIDITY_MINUTES: i64 = 15;

/// Institution-wide defaults, usually built once from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceDefaults {
    pub code_validity_minutes: i64,
    pub campus_ip_ranges: Vec<String>,
    pub fast_submission_seconds: i64,
    pub burst_window_seconds: i64,
    pub burst_threshold: u64,
}

impl Default for AttendanceDefaults {
    fn default() -> Self {
        Self {
            code_validity_minutes: DEFAULT_CODE_VALIDITY_MINUTES,
            campus_ip_ranges: Vec::new(),
            fast_submission_seconds: 5,
            burst_window_seconds: 60,
            burst_threshold: 5,
        }
    }
}

impl From<&Config> for AttendanceDefaults {
    fn from(config: &Config) -> Self {
        Self {
            code_validity_minutes: config.code_validity_minutes,
            campus_ip_ranges: config.campus_ip_ranges.clone(),
            fast_submission_seconds: config.fast_submission_seconds,
            burst_window_seconds: config.burst_window_seconds,
            burst_threshold: config.burst_threshold,
        }
    }
}

/// Effective settings for one course.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    pub validity_minutes: i64,
    pub campus_ranges: Vec<String>,
    pub fast_submission: Duration,
    pub burst_window: Duration,
    pub burst_threshold: u64,
}

impl AttendancePolicy {
    pub fn for_course(defaults: &AttendanceDefaults, course: &course::Model) -> Self {
        Self {
            validity_minutes: course
                .code_validity_minutes
                .filter(|m| *m > 0)
                .map(i64::from)
                .or(Some(defaults.code_validity_minutes).filter(|m| *m > 0))
                .unwrap_or(DEFAULT_CODE_VALIDITY_MINUTES),
            campus_ranges: course
                .campus_ranges()
                .unwrap_or_else(|| defaults.campus_ip_ranges.clone()),
            fast_submission: Duration::seconds(defaults.fast_submission_seconds),
            burst_window: Duration::seconds(defaults.burst_window_seconds),
            burst_threshold: defaults.burst_threshold,
        }
    }

    pub fn validity(&self) -> Duration {
        Duration::minutes(self.validity_minutes)
    }
}
