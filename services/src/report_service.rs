//! Analytics and report data. Everything here is read-only and rounded to two decimals; laying
//! the data out as a document is left to the caller.

use chrono::{DateTime, Utc};
use db::models::assessment::{self, AssessmentType};
use db::models::course::{self, Semester};
use db::models::user::{self, UserRole};
use db::models::{attendance_record, course_enrollment, risk_assessment};
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::aggregate::{attendance_percentage, average_percentage, present_count, round2};
use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentPerformanceRow {
    pub student_id: i64,
    pub username: String,
    pub name: String,
    pub attendance_percentage: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub assessment_type: AssessmentType,
    pub score: f64,
    pub percentage: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseTrend {
    pub course_id: i64,
    pub course_code: String,
    pub course_title: String,
    /// Oldest first.
    pub assessments: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentLine {
    pub assessment_type: AssessmentType,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseHeader {
    pub course_id: i64,
    pub code: String,
    pub title: String,
    pub department: String,
    pub semester: Semester,
    pub academic_year: String,
    pub lecturer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentCourseLine {
    pub student_id: i64,
    pub username: String,
    pub name: String,
    pub sessions_present: usize,
    pub sessions_total: usize,
    pub attendance_percentage: f64,
    pub average_score: f64,
    pub assessments: Vec<AssessmentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoursePerformanceReport {
    pub course: CourseHeader,
    pub students: Vec<StudentCourseLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentCourseSection {
    pub course_id: i64,
    pub code: String,
    pub title: String,
    pub sessions_present: usize,
    pub sessions_total: usize,
    pub attendance_percentage: f64,
    pub assessments: Vec<AssessmentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub student_id: i64,
    pub username: String,
    pub name: String,
    pub department: String,
    pub generated_at: DateTime<Utc>,
    pub courses: Vec<StudentCourseSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentSummary {
    pub department: String,
    pub total_courses: usize,
    pub total_students: u64,
    /// Medium or high risk rows belonging to the department's active courses.
    pub at_risk_students: u64,
}

fn assessment_lines(assessments: &[assessment::Model]) -> Vec<AssessmentLine> {
    assessments
        .iter()
        .map(|a| AssessmentLine {
            assessment_type: a.assessment_type,
            score: a.score,
            max_score: a.max_score,
            percentage: round2(a.percentage),
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportService;

impl ReportService {
    /// Attendance and average score side by side for every enrolled student.
    pub async fn attendance_vs_performance<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<Vec<StudentPerformanceRow>> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;

        let mut rows = Vec::new();
        for student in enrolled_students(db, course.id).await? {
            let records = attendance_record::Model::for_student(db, student.id, course.id).await?;
            let assessments = assessment::Model::for_student(db, student.id, course.id).await?;
            rows.push(StudentPerformanceRow {
                student_id: student.id,
                name: student.full_name(),
                username: student.username,
                attendance_percentage: round2(attendance_percentage(&records)),
                average_score: round2(average_percentage(&assessments)),
            });
        }
        Ok(rows)
    }

    /// A student's assessments grouped by course, in submission order. Lecturers only see the
    /// courses they teach.
    pub async fn performance_trends<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        student_id: i64,
        course_id: Option<i64>,
    ) -> AppResult<Vec<CourseTrend>> {
        if caller.role == UserRole::Student && caller.user_id != student_id {
            return Err(AppError::Unauthorized("students can only view their own records".into()));
        }
        if let Some(course_id) = course_id {
            let course = lookup::course(db, course_id).await?;
            caller.require_self_or_staff(student_id, &course)?;
        }

        let assessments = assessment::Model::for_student_all(db, student_id, course_id).await?;

        let mut trends: Vec<CourseTrend> = Vec::new();
        for a in assessments {
            if trends.last().map(|t| t.course_id) != Some(a.course_id) {
                let course = lookup::course(db, a.course_id).await?;
                if caller.role == UserRole::Lecturer && !course.is_lecturer(caller.user_id) {
                    continue;
                }
                trends.push(CourseTrend {
                    course_id: course.id,
                    course_code: course.code,
                    course_title: course.title,
                    assessments: Vec::new(),
                });
            }
            if let Some(trend) = trends.last_mut() {
                trend.assessments.push(TrendPoint {
                    assessment_type: a.assessment_type,
                    score: a.score,
                    percentage: round2(a.percentage),
                    date: a.submission_date,
                });
            }
        }
        Ok(trends)
    }

    pub async fn course_performance_report<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        course_id: i64,
    ) -> AppResult<CoursePerformanceReport> {
        let course = lookup::course(db, course_id).await?;
        caller.require_course_staff(&course)?;
        let lecturer = lookup::user(db, course.lecturer_id).await?;

        let mut students = Vec::new();
        for student in enrolled_students(db, course.id).await? {
            let records = attendance_record::Model::for_student(db, student.id, course.id).await?;
            let assessments = assessment::Model::for_student(db, student.id, course.id).await?;
            students.push(StudentCourseLine {
                student_id: student.id,
                name: student.full_name(),
                username: student.username,
                sessions_present: present_count(&records),
                sessions_total: records.len(),
                attendance_percentage: round2(attendance_percentage(&records)),
                average_score: round2(average_percentage(&assessments)),
                assessments: assessment_lines(&assessments),
            });
        }

        Ok(CoursePerformanceReport {
            course: header(course, &lecturer),
            students,
        })
    }

    /// Per-course attendance and assessments for one student, optionally a single course.
    pub async fn student_report<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        student_id: i64,
        course_id: Option<i64>,
        generated_at: DateTime<Utc>,
    ) -> AppResult<StudentReport> {
        if caller.role == UserRole::Student && caller.user_id != student_id {
            return Err(AppError::Unauthorized("students can only view their own records".into()));
        }
        let student = lookup::user(db, student_id).await?;

        let mut course_ids = course_enrollment::Model::course_ids_for_student(db, student.id).await?;
        if let Some(only) = course_id {
            course_ids.retain(|id| *id == only);
        }

        let mut courses = Vec::new();
        for id in course_ids {
            let course = lookup::course(db, id).await?;
            if caller.role == UserRole::Lecturer && !course.is_lecturer(caller.user_id) {
                continue;
            }
            let records = attendance_record::Model::for_student(db, student.id, course.id).await?;
            let assessments = assessment::Model::for_student(db, student.id, course.id).await?;
            courses.push(StudentCourseSection {
                course_id: course.id,
                code: course.code,
                title: course.title,
                sessions_present: present_count(&records),
                sessions_total: records.len(),
                attendance_percentage: round2(attendance_percentage(&records)),
                assessments: assessment_lines(&assessments),
            });
        }

        Ok(StudentReport {
            student_id: student.id,
            name: student.full_name(),
            username: student.username,
            department: student.department,
            generated_at,
            courses,
        })
    }

    pub async fn department_summary<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        department: &str,
    ) -> AppResult<DepartmentSummary> {
        caller.require_admin()?;

        let courses = course::Model::find_active_by_department(db, department).await?;
        let course_ids: Vec<i64> = courses.iter().map(|c| c.id).collect();
        let total_students =
            user::Model::count_active_in_department(db, department, UserRole::Student).await?;
        let at_risk_students =
            risk_assessment::Model::count_at_risk_in_courses(db, &course_ids).await?;

        Ok(DepartmentSummary {
            department: department.to_owned(),
            total_courses: courses.len(),
            total_students,
            at_risk_students,
        })
    }
}

async fn enrolled_students<C: ConnectionTrait>(db: &C, course_id: i64) -> AppResult<Vec<user::Model>> {
    let ids = course_enrollment::Model::student_ids(db, course_id).await?;
    let mut students = user::Model::find_many(db, &ids).await?;
    students.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(students)
}

fn header(course: course::Model, lecturer: &user::Model) -> CourseHeader {
    CourseHeader {
        course_id: course.id,
        code: course.code,
        title: course.title,
        department: course.department,
        semester: course.semester,
        academic_year: course.academic_year,
        lecturer_name: lecturer.full_name(),
    }
}
