//! Courses and their attendance-code settings.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents a course in the `courses` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Upper-cased course code, e.g. `CSC301`.
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    pub department: String,
    pub semester: Semester,
    /// Academic year label, e.g. `2024/2025`.
    pub academic_year: String,
    pub credit_units: i32,
    /// Lecturer responsible for the course.
    pub lecturer_id: i64,
    pub max_students: i32,
    /// Per-course override of the attendance code lifetime, in minutes.
    pub code_validity_minutes: Option<i32>,
    /// Per-course override of campus network ranges, comma separated.
    pub campus_ip_ranges: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Semester {
    #[sea_orm(string_value = "first")]
    First,
    #[sea_orm(string_value = "second")]
    Second,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LecturerId",
        to = "super::user::Column::Id"
    )]
    Lecturer,
    #[sea_orm(has_many = "super::course_enrollment::Entity")]
    Enrollments,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl Related<super::course_enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields required to create a course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub department: String,
    pub semester: Semester,
    pub academic_year: String,
    pub credit_units: i32,
    pub lecturer_id: i64,
    pub max_students: Option<i32>,
}

pub const DEFAULT_MAX_STUDENTS: i32 = 100;

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, new: NewCourse) -> Result<Model, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            code: Set(new.code.trim().to_uppercase()),
            title: Set(new.title.trim().to_owned()),
            department: Set(new.department),
            semester: Set(new.semester),
            academic_year: Set(new.academic_year),
            credit_units: Set(new.credit_units),
            lecturer_id: Set(new.lecturer_id),
            max_students: Set(new.max_students.unwrap_or(DEFAULT_MAX_STUDENTS)),
            code_validity_minutes: Set(None),
            campus_ip_ranges: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_active_by_department<C: ConnectionTrait>(
        db: &C,
        department: &str,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Department.eq(department))
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::Code)
            .all(db)
            .await
    }

    /// Replaces the attendance overrides. `None` falls back to the configured defaults.
    pub async fn set_attendance_settings<C: ConnectionTrait>(
        db: &C,
        id: i64,
        code_validity_minutes: Option<i32>,
        campus_ip_ranges: Option<Vec<String>>,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Course {id} not found")))?
            .into();

        active.code_validity_minutes = Set(code_validity_minutes);
        active.campus_ip_ranges = Set(campus_ip_ranges.map(|ranges| ranges.join(",")));
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Soft delete: the course stays for historical records but stops being listed.
    pub async fn deactivate<C: ConnectionTrait>(db: &C, id: i64) -> Result<Model, DbErr> {
        let mut active: ActiveModel = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Course {id} not found")))?
            .into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Campus ranges configured on this course, if any are set.
    pub fn campus_ranges(&self) -> Option<Vec<String>> {
        let ranges = common::config::split_ranges(self.campus_ip_ranges.as_deref()?);
        if ranges.is_empty() { None } else { Some(ranges) }
    }

    pub fn is_lecturer(&self, user_id: i64) -> bool {
        self.lecturer_id == user_id
    }
}
