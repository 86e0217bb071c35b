use std::collections::BTreeSet;

use db::models::course::{self, NewCourse, Semester};
use db::models::user::{self, UserRole};
use db::models::course_enrollment;
use log::{info, warn};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourse {
    #[validate(length(min = 3, max = 16, message = "Course code must be 3-16 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Course title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
    pub semester: Semester,
    #[validate(length(min = 4, message = "Academic year is required"))]
    pub academic_year: String,
    #[validate(range(min = 1, max = 6, message = "Credit units must be between 1 and 6"))]
    pub credit_units: i32,
    /// Required when an admin creates the course; a lecturer always creates for themselves.
    pub lecturer_id: Option<i64>,
    #[validate(range(min = 1, message = "Course capacity must be positive"))]
    pub max_students: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AttendanceSettings {
    #[validate(range(min = 1, max = 240, message = "Code validity must be 1-240 minutes"))]
    pub code_validity_minutes: Option<i32>,
    pub campus_ip_ranges: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentRejection {
    pub student_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrollmentResult {
    pub enrolled: Vec<i64>,
    /// Already enrolled before this call.
    pub skipped: Vec<i64>,
    pub rejected: Vec<EnrollmentRejection>,
    /// Enrollment count after this call.
    pub enrolled_count: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CourseService;

impl CourseService {
    pub async fn create_course<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        input: CreateCourse,
    ) -> AppResult<course::Model> {
        input.validate()?;

        let lecturer_id = match caller.role {
            UserRole::Lecturer => caller.user_id,
            UserRole::Admin => input.lecturer_id.ok_or_else(|| {
                AppError::Validation("lecturer_id is required when an admin creates a course".into())
            })?,
            UserRole::Student => {
                return Err(AppError::Unauthorized("students cannot create courses".into()));
            }
        };
        let lecturer = lookup::user(db, lecturer_id).await?;
        if lecturer.role != UserRole::Lecturer {
            return Err(AppError::Validation(format!("user {lecturer_id} is not a lecturer")));
        }

        let created = course::Model::create(
            db,
            NewCourse {
                code: input.code,
                title: input.title,
                department: input.department,
                semester: input.semester,
                academic_year: input.academic_year,
                credit_units: input.credit_units,
                lecturer_id,
                max_students: input.max_students,
            },
        )
        .await?;

        info!("Course {} created for lecturer {}", created.code, lecturer_id);
        Ok(created)
    }

    pub async fn configure_attendance<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        settings: AttendanceSettings,
    ) -> AppResult<course::Model> {
        settings.validate()?;
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let ranges = settings.campus_ip_ranges.map(|ranges| {
            ranges
                .into_iter()
                .map(|r| r.trim().to_owned())
                .filter(|r| !r.is_empty())
                .collect::<Vec<_>>()
        });
        if let Some(bad) = ranges.iter().flatten().find(|r| r.contains(',')) {
            return Err(AppError::Validation(format!("invalid campus range '{bad}'")));
        }

        Ok(course::Model::set_attendance_settings(
            db,
            course.id,
            settings.code_validity_minutes,
            ranges.filter(|r| !r.is_empty()),
        )
        .await?)
    }

    /// Enrolls students in input order. Ids already enrolled are skipped; non-students and
    /// students beyond the course capacity are rejected individually.
    pub async fn enroll_students<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
        student_ids: &[i64],
    ) -> AppResult<EnrollmentResult> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let mut seen = BTreeSet::new();
        let requested: Vec<i64> = student_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let users = user::Model::find_many(db, &requested).await?;

        let mut result = EnrollmentResult::default();
        let mut count = course_enrollment::Model::count(db, course.id).await?;
        let capacity = u64::try_from(course.max_students).unwrap_or(0);

        for student_id in requested {
            let reject = |reason: &str| EnrollmentRejection {
                student_id,
                reason: reason.to_string(),
            };

            match users.iter().find(|u| u.id == student_id) {
                Some(u) if u.is_student() => {}
                Some(_) => {
                    result.rejected.push(reject("User is not a student"));
                    continue;
                }
                None => {
                    result.rejected.push(reject("Student not found"));
                    continue;
                }
            }

            if course_enrollment::Model::is_enrolled(db, course.id, student_id).await? {
                result.skipped.push(student_id);
                continue;
            }
            if count >= capacity {
                result.rejected.push(reject("Course is at capacity"));
                continue;
            }

            course_enrollment::Model::enroll(db, course.id, student_id).await?;
            result.enrolled.push(student_id);
            count += 1;
        }

        if !result.rejected.is_empty() {
            warn!("{} enrollment(s) rejected for {}", result.rejected.len(), course.code);
        }
        info!(
            "Enrolled {} student(s) in {} ({} skipped)",
            result.enrolled.len(),
            course.code,
            result.skipped.len()
        );
        result.enrolled_count = count;
        Ok(result)
    }

    /// Soft delete. Records stay readable; the course drops out of department listings.
    pub async fn deactivate_course<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<course::Model> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let updated = course::Model::deactivate(db, course.id).await?;
        info!("Course {} deactivated by user {}", updated.code, caller.user_id);
        Ok(updated)
    }

    pub async fn list_students<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<Vec<user::Model>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let ids = course_enrollment::Model::student_ids(db, course.id).await?;
        let mut students = user::Model::find_many(db, &ids).await?;
        students.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(students)
    }
}
