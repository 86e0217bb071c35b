use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use db::models::attendance_record::{self, VerificationStatus};
use sea_orm::ConnectionTrait;
use serde::Serialize;

use super::AttendanceEngine;
use crate::aggregate::{attendance_percentage, present_count, round2};
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub present: usize,
    pub flagged: usize,
    /// Rows still in the `absent` state.
    pub absent: usize,
}

impl SessionStats {
    fn from_records(records: &[attendance_record::Model]) -> Self {
        let count = |status: VerificationStatus| records.iter().filter(|r| r.verification_status == status).count();
        Self {
            total: records.len(),
            present: present_count(records),
            flagged: count(VerificationStatus::Flagged),
            absent: count(VerificationStatus::Absent),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAttendance {
    pub records: Vec<attendance_record::Model>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAttendanceStats {
    pub total_sessions: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub attendance_percentage: f64,
    /// Newest session first.
    pub records: Vec<attendance_record::Model>,
}

/// One calendar day of a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub date: NaiveDate,
    pub topic: Option<String>,
    pub total: usize,
    pub present: usize,
    pub flagged: usize,
    /// Everything neither present nor flagged, rejected reviews included.
    pub absent: usize,
}

/// `[from 00:00, to + 1 day 00:00)` in UTC.
fn day_bounds(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
    (start, end)
}

impl AttendanceEngine {
    /// Records of one session day (UTC) with live counts.
    pub async fn session_attendance<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        date: NaiveDate,
    ) -> AppResult<SessionAttendance> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let (start, end) = day_bounds(date, date);
        let mut records =
            attendance_record::Model::for_course_between(db, course.id, start, end).await?;
        // Most recent submissions first, unsubmitted rows last.
        records.sort_by(|a, b| b.submission_time.cmp(&a.submission_time));

        let stats = SessionStats::from_records(&records);
        Ok(SessionAttendance { records, stats })
    }

    pub async fn flagged_records<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<Vec<attendance_record::Model>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;
        Ok(attendance_record::Model::flagged_for_course(db, course.id).await?)
    }

    pub async fn student_stats<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        student_id: i64,
        course_id: i64,
    ) -> AppResult<StudentAttendanceStats> {
        let course = lookup::course(db, course_id).await?;
        caller.require_self_or_staff(student_id, &course)?;

        let records = attendance_record::Model::for_student(db, student_id, course.id).await?;
        let present = present_count(&records);
        Ok(StudentAttendanceStats {
            total_sessions: records.len(),
            present_count: present,
            absent_count: records.len() - present,
            attendance_percentage: round2(attendance_percentage(&records)),
            records,
        })
    }

    /// Per-day summary of a course, optionally limited to an inclusive date range.
    pub async fn attendance_summary<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<SessionSummary>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "start date {from} is after end date {to}"
                )));
            }
        }
        let start = from.map(|d| day_bounds(d, d).0);
        let end = to.map(|d| day_bounds(d, d).1);
        let records = attendance_record::Model::for_course(db, course.id, start, end).await?;

        let mut days: BTreeMap<NaiveDate, SessionSummary> = BTreeMap::new();
        for record in &records {
            let date = record.session_date.date_naive();
            let day = days.entry(date).or_insert_with(|| SessionSummary {
                date,
                topic: None,
                total: 0,
                present: 0,
                flagged: 0,
                absent: 0,
            });
            if day.topic.is_none() {
                day.topic = record.session_topic.clone();
            }
            day.total += 1;
            match record.verification_status {
                s if s.counts_as_present() => day.present += 1,
                VerificationStatus::Flagged => day.flagged += 1,
                _ => day.absent += 1,
            }
        }

        Ok(days.into_values().collect())
    }
}
