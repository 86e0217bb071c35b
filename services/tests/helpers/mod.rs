#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use db::models::course::{self, NewCourse, Semester};
use db::models::course_enrollment;
use db::models::user::{self, UserRole};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use services::attendance::{AttendanceEngine, CodeSource};
use services::clock::{Clock, FixedClock};
use services::context::Caller;
use services::policy::AttendanceDefaults;

pub const CAMPUS_RANGE: &str = "10.20.0.0/16";
pub const CAMPUS_IP: &str = "10.20.4.17";
pub const OFF_CAMPUS_IP: &str = "41.58.3.2";

/// Hands out 100000, 100001, ... so tests know which codes exist.
pub struct SequentialCodes(AtomicU32);

impl SequentialCodes {
    pub fn new() -> Self {
        Self(AtomicU32::new(100_000))
    }
}

impl CodeSource for SequentialCodes {
    fn next_code(&self) -> String {
        self.0.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

pub struct TestWorld {
    pub db: DatabaseConnection,
    pub clock: Arc<FixedClock>,
    pub engine: AttendanceEngine,
    pub admin: Caller,
    pub lecturer: Caller,
    pub other_lecturer: Caller,
    pub course: course::Model,
    pub students: Vec<Caller>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub fn defaults() -> AttendanceDefaults {
    AttendanceDefaults {
        campus_ip_ranges: vec![CAMPUS_RANGE.to_string()],
        ..Default::default()
    }
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: UserRole) -> user::Model {
    user::Model::create(
        db,
        username,
        &format!("{username}@uni.test"),
        "Test",
        username,
        role,
        "Computer Science",
    )
    .await
    .expect("create user")
}

pub async fn create_course(db: &DatabaseConnection, code: &str, lecturer_id: i64) -> course::Model {
    course::Model::create(
        db,
        NewCourse {
            code: code.into(),
            title: format!("{code} title"),
            department: "Computer Science".into(),
            semester: Semester::First,
            academic_year: "2024/2025".into(),
            credit_units: 3,
            lecturer_id,
            max_students: None,
        },
    )
    .await
    .expect("create course")
}

/// Admin, two lecturers, one course owned by the first lecturer, `n_students` enrolled students.
pub async fn world(n_students: usize) -> TestWorld {
    let db = setup_test_db().await;

    let admin = create_user(&db, "admin", UserRole::Admin).await;
    let lecturer = create_user(&db, "lecturer", UserRole::Lecturer).await;
    let other = create_user(&db, "other", UserRole::Lecturer).await;
    let course = create_course(&db, "CSC301", lecturer.id).await;

    let mut students = Vec::new();
    for i in 0..n_students {
        let s = create_user(&db, &format!("u{:04}", i + 1), UserRole::Student).await;
        course_enrollment::Model::enroll(&db, course.id, s.id).await.expect("enroll");
        students.push(Caller::new(s.id, UserRole::Student));
    }

    let clock = Arc::new(FixedClock::new(t0()));
    let engine = AttendanceEngine::new(
        defaults(),
        clock.clone() as Arc<dyn Clock>,
        Arc::new(SequentialCodes::new()),
    );

    TestWorld {
        db,
        clock,
        engine,
        admin: Caller::new(admin.id, UserRole::Admin),
        lecturer: Caller::new(lecturer.id, UserRole::Lecturer),
        other_lecturer: Caller::new(other.id, UserRole::Lecturer),
        course,
        students,
    }
}
