//! Shared arithmetic for statistics and reports.

use db::models::{assessment, attendance_record};

/// Present records over all records, as a percentage. 0 when there are none.
pub fn attendance_percentage(records: &[attendance_record::Model]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    present_count(records) as f64 / records.len() as f64 * 100.0
}

pub fn present_count(records: &[attendance_record::Model]) -> usize {
    records
        .iter()
        .filter(|r| r.verification_status.counts_as_present())
        .count()
}

/// Mean assessment percentage. 0 when there are none.
pub fn average_percentage(assessments: &[assessment::Model]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    assessments.iter().map(|a| a.percentage).sum::<f64>() / assessments.len() as f64
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
