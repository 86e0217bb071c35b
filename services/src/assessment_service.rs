use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::assessment::{self, AssessmentType, NewAssessment};
use db::models::{course_enrollment, user};
use log::info;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::aggregate::{average_percentage, round2};
use crate::clock::{Clock, SystemClock};
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssessment {
    pub course_id: i64,
    pub student_id: i64,
    pub assessment_type: AssessmentType,
    #[validate(range(min = 0.0, message = "Score cannot be negative"))]
    pub score: f64,
    #[validate(range(exclusive_min = 0.0, message = "Max score must be greater than zero"))]
    pub max_score: f64,
    #[validate(length(max = 500, message = "Remarks must be at most 500 characters"))]
    pub remarks: Option<String>,
    /// Defaults to now.
    pub submission_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAssessment {
    #[validate(range(min = 0.0, message = "Score cannot be negative"))]
    pub score: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Max score must be greater than zero"))]
    pub max_score: Option<f64>,
    #[validate(length(max = 500, message = "Remarks must be at most 500 characters"))]
    pub remarks: Option<String>,
}

/// One line of a bulk score upload, as read from the sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkScoreRow {
    pub username: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRowError {
    pub username: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadResult {
    pub uploaded: u64,
    pub errors: Vec<BulkRowError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAssessments {
    /// Newest first.
    pub assessments: Vec<assessment::Model>,
    pub total_assessments: usize,
    pub average_score: f64,
}

fn ensure_finite(fields: &[(&str, Option<f64>)]) -> AppResult<()> {
    for (name, value) in fields {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(AppError::Validation(format!("{name} must be a finite number")));
            }
        }
    }
    Ok(())
}

pub struct AssessmentService {
    clock: Arc<dyn Clock>,
}

impl Default for AssessmentService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AssessmentService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        input: CreateAssessment,
    ) -> AppResult<assessment::Model> {
        ensure_finite(&[("score", Some(input.score)), ("max_score", Some(input.max_score))])?;
        input.validate()?;

        let course = lookup::course(db, input.course_id).await?;
        caller.require_course_staff(&course)?;
        if !course_enrollment::Model::is_enrolled(db, course.id, input.student_id).await? {
            return Err(AppError::Validation(format!(
                "student {} is not enrolled in {}",
                input.student_id, course.code
            )));
        }

        let created = assessment::Model::create(
            db,
            NewAssessment {
                course_id: course.id,
                student_id: input.student_id,
                assessment_type: input.assessment_type,
                score: input.score,
                max_score: input.max_score,
                submission_date: input.submission_date.unwrap_or_else(|| self.clock.now()),
                entered_by: caller.user_id,
                remarks: input.remarks,
            },
        )
        .await?;

        info!(
            "Assessment {} ({}) recorded for student {} in {}",
            created.id, created.assessment_type, created.student_id, course.code
        );
        Ok(created)
    }

    /// Records one assessment type for many students at once. Rows naming unknown or
    /// unenrolled students, or carrying unreadable scores, are reported and skipped; the rest
    /// are inserted together.
    pub async fn bulk_record<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        assessment_type: AssessmentType,
        max_score: f64,
        rows: &[BulkScoreRow],
    ) -> AppResult<BulkUploadResult> {
        ensure_finite(&[("max_score", Some(max_score))])?;
        if max_score <= 0.0 {
            return Err(AppError::Validation("Max score must be greater than zero".into()));
        }

        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let submission_date = self.clock.now();
        let mut accepted = Vec::new();
        let mut errors = Vec::new();

        for row in rows {
            let reject = |error: &str| BulkRowError {
                username: row.username.clone(),
                error: error.to_string(),
            };

            let student = match user::Model::find_by_username(db, &row.username).await? {
                Some(u) if u.is_student() => u,
                _ => {
                    errors.push(reject("Student not found"));
                    continue;
                }
            };
            if !course_enrollment::Model::is_enrolled(db, course.id, student.id).await? {
                errors.push(reject("Student not enrolled in course"));
                continue;
            }
            let score = match row.score.trim().parse::<f64>() {
                Ok(s) if s.is_finite() && s >= 0.0 => s,
                _ => {
                    errors.push(reject("Invalid score"));
                    continue;
                }
            };

            accepted.push(NewAssessment {
                course_id: course.id,
                student_id: student.id,
                assessment_type,
                score,
                max_score,
                submission_date,
                entered_by: caller.user_id,
                remarks: None,
            });
        }

        let uploaded = assessment::Model::insert_many(db, accepted).await?;
        info!(
            "Bulk upload to {}: {} rows stored, {} rejected",
            course.code,
            uploaded,
            errors.len()
        );
        Ok(BulkUploadResult { uploaded, errors })
    }

    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        assessment_id: i64,
        input: UpdateAssessment,
    ) -> AppResult<assessment::Model> {
        ensure_finite(&[("score", input.score), ("max_score", input.max_score)])?;
        input.validate()?;

        let existing = self.load(db, assessment_id).await?;
        let course = lookup::course(db, existing.course_id).await?;
        caller.require_course_staff(&course)?;

        Ok(assessment::Model::update_scores(
            db,
            existing.id,
            input.score,
            input.max_score,
            input.remarks,
        )
        .await?)
    }

    pub async fn delete<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        assessment_id: i64,
    ) -> AppResult<()> {
        let existing = self.load(db, assessment_id).await?;
        let course = lookup::course(db, existing.course_id).await?;
        caller.require_course_staff(&course)?;

        assessment::Model::delete_by_id(db, existing.id).await?;
        info!("Assessment {} deleted by user {}", existing.id, caller.user_id);
        Ok(())
    }

    pub async fn list_for_course<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        assessment_type: Option<AssessmentType>,
    ) -> AppResult<Vec<assessment::Model>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;
        Ok(assessment::Model::for_course(db, course.id, assessment_type).await?)
    }

    pub async fn student_assessments<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        student_id: i64,
        course_id: i64,
    ) -> AppResult<StudentAssessments> {
        let course = lookup::course(db, course_id).await?;
        caller.require_self_or_staff(student_id, &course)?;

        let mut assessments = assessment::Model::for_student(db, student_id, course.id).await?;
        let average_score = round2(average_percentage(&assessments));
        assessments.reverse();

        Ok(StudentAssessments {
            total_assessments: assessments.len(),
            average_score,
            assessments,
        })
    }

    async fn load<C: ConnectionTrait>(&self, db: &C, id: i64) -> AppResult<assessment::Model> {
        assessment::Model::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assessment {id}")))
    }
}
