use db::models::attendance_record::{self, SubmissionUpdate, VerificationStatus};
use log::{debug, info, warn};
use sea_orm::ConnectionTrait;
use serde::Serialize;

use super::heuristics::{self, SubmissionSignals};
use super::AttendanceEngine;
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;
use crate::policy::AttendancePolicy;

pub const FLAGGED_NOTE: &str =
    "Your submission has been flagged for review. Your lecturer will verify it.";

#[derive(Debug, Clone)]
pub struct SubmissionRequest<'a> {
    pub course_id: i64,
    pub code: &'a str,
    pub ip_address: Option<&'a str>,
    pub device_info: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub record_id: i64,
    pub status: VerificationStatus,
    pub flag_reasons: Vec<String>,
    /// Present only for flagged submissions.
    pub note: Option<&'static str>,
}

impl AttendanceEngine {
    /// Records a student's code submission against the session it belongs to.
    ///
    /// Fails with [`AppError::InvalidOrExpired`] without touching anything when no unexpired
    /// record carries the code, and with [`AppError::AlreadySubmitted`] when the record was
    /// already written, including when a concurrent submission wins the race.
    pub async fn submit<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        request: SubmissionRequest<'_>,
    ) -> AppResult<SubmissionOutcome> {
        caller.require_student()?;
        let course = lookup::course(db, request.course_id).await?;
        let policy = AttendancePolicy::for_course(&self.defaults, &course);
        let now = self.clock.now();

        let record = attendance_record::Model::find_outstanding(
            db,
            course.id,
            caller.user_id,
            request.code.trim(),
            now,
        )
        .await?
        .ok_or(AppError::InvalidOrExpired)?;

        if record.is_submitted() {
            return Err(AppError::AlreadySubmitted);
        }

        let ip_address = request.ip_address.map(str::trim).filter(|ip| !ip.is_empty());
        let recent_from_ip = match ip_address {
            Some(ip) => {
                attendance_record::Model::count_recent_from_ip(
                    db,
                    course.id,
                    ip,
                    now - policy.burst_window,
                )
                .await?
            }
            None => 0,
        };

        let flag_reasons = heuristics::evaluate(
            &SubmissionSignals {
                ip_address,
                now,
                code_generated_at: record.code_generated_at,
                recent_from_ip,
            },
            &policy,
        );
        let status = if flag_reasons.is_empty() {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Flagged
        };

        let written = attendance_record::Model::record_submission(
            db,
            record.id,
            SubmissionUpdate {
                submitted_at: now,
                ip_address: ip_address.map(str::to_owned),
                device_info: request.device_info.map(str::to_owned),
                status,
                flag_reasons: flag_reasons.clone(),
            },
        )
        .await?;

        if !written {
            warn!(
                "Concurrent submission lost the race for record {} (student {})",
                record.id, caller.user_id
            );
            return Err(AppError::AlreadySubmitted);
        }

        if flag_reasons.is_empty() {
            info!("Attendance verified: record {} student {}", record.id, caller.user_id);
        } else {
            info!(
                "Attendance flagged: record {} student {} ({})",
                record.id,
                caller.user_id,
                flag_reasons.join("; ")
            );
        }
        debug!("Submission from {:?}, {} recent from same IP", ip_address, recent_from_ip);

        Ok(SubmissionOutcome {
            record_id: record.id,
            status,
            note: (status == VerificationStatus::Flagged).then_some(FLAGGED_NOTE),
            flag_reasons,
        })
    }
}
