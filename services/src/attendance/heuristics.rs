//! Anti-fraud checks run on every first submission. All checks run; reasons keep this order.

use chrono::{DateTime, Utc};

use super::network::is_campus_ip;
use crate::policy::AttendancePolicy;

pub const OFF_CAMPUS: &str = "Submitted from off-campus network";
pub const FAST_SUBMISSION: &str = "Unusually fast submission";
pub const SHARED_IP_BURST: &str = "Multiple submissions from same IP";

/// What is known about a submission at the time it arrives.
#[derive(Debug, Clone)]
pub struct SubmissionSignals<'a> {
    pub ip_address: Option<&'a str>,
    pub now: DateTime<Utc>,
    pub code_generated_at: DateTime<Utc>,
    /// Submissions already stored for the course from the same address inside the burst window.
    pub recent_from_ip: u64,
}

pub fn evaluate(signals: &SubmissionSignals<'_>, policy: &AttendancePolicy) -> Vec<String> {
    let mut reasons = Vec::new();

    if !is_campus_ip(signals.ip_address, &policy.campus_ranges) {
        reasons.push(OFF_CAMPUS.to_string());
    }

    if signals.now - signals.code_generated_at < policy.fast_submission {
        reasons.push(FAST_SUBMISSION.to_string());
    }

    if signals.recent_from_ip > policy.burst_threshold {
        reasons.push(SHARED_IP_BURST.to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn policy() -> AttendancePolicy {
        AttendancePolicy {
            validity_minutes: 15,
            campus_ranges: vec!["10.20.0.0/16".into()],
            fast_submission: Duration::seconds(5),
            burst_window: Duration::seconds(60),
            burst_threshold: 5,
        }
    }

    fn signals(ip: Option<&str>, after: Duration, recent: u64) -> SubmissionSignals<'_> {
        let generated = Utc.with_ymd_and_hms(2025, 5, 5, 10, 0, 0).unwrap();
        SubmissionSignals {
            ip_address: ip,
            now: generated + after,
            code_generated_at: generated,
            recent_from_ip: recent,
        }
    }

    #[test]
    fn clean_submission_has_no_reasons() {
        let reasons = evaluate(&signals(Some("10.20.1.1"), Duration::seconds(30), 5), &policy());
        assert!(reasons.is_empty());
    }

    #[test]
    fn all_reasons_in_order() {
        let reasons = evaluate(&signals(Some("8.8.8.8"), Duration::seconds(2), 6), &policy());
        assert_eq!(reasons, vec![OFF_CAMPUS, FAST_SUBMISSION, SHARED_IP_BURST]);
    }

    #[test]
    fn timing_boundary_is_exclusive() {
        let at_limit = evaluate(&signals(Some("10.20.1.1"), Duration::seconds(5), 0), &policy());
        assert!(at_limit.is_empty());
        let just_under =
            evaluate(&signals(Some("10.20.1.1"), Duration::milliseconds(4_999), 0), &policy());
        assert_eq!(just_under, vec![FAST_SUBMISSION]);
    }

    #[test]
    fn missing_ip_is_off_campus() {
        let reasons = evaluate(&signals(None, Duration::seconds(30), 0), &policy());
        assert_eq!(reasons, vec![OFF_CAMPUS]);
    }
}
