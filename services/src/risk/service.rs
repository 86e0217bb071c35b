use std::sync::Arc;

use db::models::risk_assessment::{self, RiskLevel, RiskSnapshot};
use db::models::{assessment, attendance_record, course_enrollment};
use log::{debug, info};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;

use super::rules::{classify, RiskInputs};
use crate::aggregate::{attendance_percentage, average_percentage};
use crate::clock::{Clock, SystemClock};
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskSummary {
    fn tally(rows: &[risk_assessment::Model]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            match row.risk_level {
                RiskLevel::Low => acc.low += 1,
                RiskLevel::Medium => acc.medium += 1,
                RiskLevel::High => acc.high += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseRiskReport {
    pub assessments: Vec<risk_assessment::Model>,
    pub summary: RiskSummary,
}

pub struct RiskEngine {
    clock: Arc<dyn Clock>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RiskEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Recomputes and stores the classification for one (student, course) pair. Safe to call
    /// repeatedly; the cached row is replaced in place.
    pub async fn materialize<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: i64,
        course_id: i64,
    ) -> AppResult<risk_assessment::Model> {
        let records = attendance_record::Model::for_student(db, student_id, course_id).await?;
        let assessments = assessment::Model::for_student(db, student_id, course_id).await?;

        let attendance = attendance_percentage(&records);
        let average = average_percentage(&assessments);
        let percentages: Vec<f64> = assessments.iter().map(|a| a.percentage).collect();

        let classification = classify(RiskInputs {
            attendance_percentage: attendance,
            average_score: average,
            assessment_percentages: &percentages,
        });
        debug!(
            "Student {} in course {}: attendance {:.2}%, average {:.2}% -> {}",
            student_id, course_id, attendance, average, classification.level
        );

        let row = risk_assessment::Model::upsert(
            db,
            RiskSnapshot {
                student_id,
                course_id,
                risk_level: classification.level,
                attendance_percentage: attendance,
                average_score: average,
                factors: classification.factors,
                calculated_at: self.clock.now(),
            },
        )
        .await?;
        Ok(row)
    }

    /// Recomputes every enrolled student of a course.
    pub async fn assess_course<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<CourseRiskReport> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let students = course_enrollment::Model::student_ids(db, course.id).await?;
        let mut assessments = Vec::with_capacity(students.len());
        for student_id in students {
            assessments.push(self.materialize(db, student_id, course.id).await?);
        }

        let summary = RiskSummary::tally(&assessments);
        info!(
            "Risk recomputed for {}: {} low, {} medium, {} high",
            course.code, summary.low, summary.medium, summary.high
        );
        Ok(CourseRiskReport { assessments, summary })
    }

    /// Cached medium and high rows, high first, then most recent.
    pub async fn at_risk_students<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<Vec<risk_assessment::Model>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;
        Ok(risk_assessment::Model::at_risk_for_course(db, course.id).await?)
    }

    pub async fn record_intervention<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        risk_id: i64,
        notes: Option<String>,
        notification_sent: bool,
    ) -> AppResult<risk_assessment::Model> {
        let row = risk_assessment::Entity::find_by_id(risk_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Risk assessment {risk_id}")))?;
        let course = lookup::course(db, row.course_id).await?;
        caller.require_course_staff(&course)?;

        let updated =
            risk_assessment::Model::record_intervention(db, row.id, notes, notification_sent).await?;
        info!("Intervention recorded on risk assessment {} by user {}", row.id, caller.user_id);
        Ok(updated)
    }
}
