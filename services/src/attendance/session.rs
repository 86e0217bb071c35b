use chrono::{DateTime, Utc};
use db::models::{attendance_record, course_enrollment};
use log::info;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use super::AttendanceEngine;
use crate::context::Caller;
use crate::error::AppResult;
use crate::lookup;
use crate::policy::AttendancePolicy;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCode {
    pub code: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub validity_minutes: i64,
    /// Placeholder rows created, one per enrolled student.
    pub students_count: u64,
}

impl AttendanceEngine {
    /// Opens a session: draws a fresh code and creates an `absent` row for every enrolled student.
    pub async fn generate_code<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        session_topic: Option<&str>,
    ) -> AppResult<GeneratedCode> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let policy = AttendancePolicy::for_course(&self.defaults, &course);
        let code = self.codes.next_code();
        let generated_at = self.clock.now();
        let expires_at = generated_at + policy.validity();

        let students = course_enrollment::Model::student_ids(db, course_id).await?;
        let topic = session_topic.map(str::trim).filter(|t| !t.is_empty());
        let session = attendance_record::NewSession {
            course_id,
            session_date: generated_at,
            session_topic: topic,
            code: &code,
            generated_at,
            expires_at,
        };
        let students_count =
            attendance_record::Model::insert_placeholders(db, &session, &students).await?;

        info!(
            "Attendance code generated for {} by user {} ({} students, valid {} min)",
            course.code, caller.user_id, students_count, policy.validity_minutes
        );

        Ok(GeneratedCode {
            code,
            generated_at,
            expires_at,
            validity_minutes: policy.validity_minutes,
            students_count,
        })
    }
}
