use std::collections::BTreeSet;

use db::models::attendance_record::{self, ReviewUpdate, VerificationStatus};
use log::info;
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::AttendanceEngine;
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn status(self) -> VerificationStatus {
        match self {
            ReviewAction::Approve => VerificationStatus::ManualApproved,
            ReviewAction::Reject => VerificationStatus::ManualRejected,
        }
    }
}

#[derive(Debug, Validate)]
struct ReviewNote {
    #[validate(length(max = 500, message = "Review note must be at most 500 characters"))]
    note: Option<String>,
}

fn checked_note(note: Option<&str>) -> AppResult<Option<String>> {
    let checked = ReviewNote {
        note: note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_owned),
    };
    checked.validate()?;
    Ok(checked.note)
}

impl AttendanceEngine {
    /// Overrides the status of one record. Any status may be reviewed, repeatedly; the last
    /// review wins and heuristics are not re-run.
    pub async fn review<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        record_id: i64,
        action: ReviewAction,
        note: Option<&str>,
    ) -> AppResult<attendance_record::Model> {
        let note = checked_note(note)?;
        let record = attendance_record::Entity::find_by_id(record_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attendance record {record_id}")))?;
        let course = lookup::course(db, record.course_id).await?;
        caller.require_course_staff(&course)?;

        let update = ReviewUpdate {
            status: action.status(),
            reviewer_id: caller.user_id,
            note,
            reviewed_at: self.clock.now(),
        };
        let reviewed = attendance_record::Model::review(db, record.id, &update).await?;

        info!(
            "Attendance record {} reviewed by user {}: {} -> {}",
            record.id, caller.user_id, record.verification_status, reviewed.verification_status
        );
        Ok(reviewed)
    }

    /// Applies one review to many records of a course. Ids from other courses are ignored.
    /// Returns how many statuses changed.
    ///
    /// Unlike [`AttendanceEngine::review`], records already in the target status are skipped
    /// and keep their previous reviewer, note and review time.
    pub async fn bulk_review<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        record_ids: &[i64],
        action: ReviewAction,
        note: Option<&str>,
    ) -> AppResult<u64> {
        let note = checked_note(note)?;
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let ids: Vec<i64> = record_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let update = ReviewUpdate {
            status: action.status(),
            reviewer_id: caller.user_id,
            note,
            reviewed_at: self.clock.now(),
        };
        let changed = attendance_record::Model::bulk_review(db, course.id, &ids, &update).await?;

        info!(
            "Bulk review on {} by user {}: {} of {} records set to {}",
            course.code,
            caller.user_id,
            changed,
            ids.len(),
            update.status
        );
        Ok(changed)
    }
}
