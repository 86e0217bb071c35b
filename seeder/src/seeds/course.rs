use crate::seed::Seeder;
use crate::seeds::{CAMPUS_RANGE, admin};
use async_trait::async_trait;
use db::models::course::Semester;
use db::models::user::Model as User;
use sea_orm::DatabaseConnection;
use services::course_service::{AttendanceSettings, CourseService, CreateCourse};
use services::{AppError, AppResult};

pub struct CourseSeeder;

const COURSES: [(&str, &str, &str, &str, Semester); 5] = [
    ("CSC201", "Data Structures", "Computer Science", "lect01", Semester::First),
    ("CSC301", "Software Engineering", "Computer Science", "lect02", Semester::First),
    ("CSC305", "Operating Systems", "Computer Science", "lect03", Semester::Second),
    ("CSC411", "Distributed Systems", "Computer Science", "lect02", Semester::Second),
    ("MTH202", "Linear Algebra", "Mathematics", "lect04", Semester::First),
];

#[async_trait]
impl Seeder for CourseSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let admin = admin(db).await?;

        for (code, title, department, lecturer, semester) in COURSES {
            let lecturer = User::find_by_username(db, lecturer)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {lecturer}")))?;

            let course = CourseService
                .create_course(
                    db,
                    &admin,
                    CreateCourse {
                        code: code.to_string(),
                        title: title.to_string(),
                        department: department.to_string(),
                        semester,
                        academic_year: "2025/2026".to_string(),
                        credit_units: 3,
                        lecturer_id: Some(lecturer.id),
                        max_students: Some(40),
                    },
                )
                .await?;

            CourseService
                .configure_attendance(
                    db,
                    &admin,
                    course.id,
                    AttendanceSettings {
                        code_validity_minutes: Some(15),
                        campus_ip_ranges: Some(vec![CAMPUS_RANGE.to_string()]),
                    },
                )
                .await?;
        }

        Ok(())
    }
}
