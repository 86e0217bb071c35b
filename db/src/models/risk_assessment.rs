//! Cached risk classification, one live row per (student, course).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "risk_assessments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub risk_level: RiskLevel,
    pub attendance_percentage: f64,
    pub average_score: f64,
    /// JSON array of factor descriptions, in rule order.
    #[sea_orm(column_type = "JsonBinary")]
    pub factors: Json,
    pub calculated_at: DateTime<Utc>,
    pub notification_sent: bool,
    pub intervention_notes: Option<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
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
pub enum RiskLevel {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A freshly computed classification for one (student, course) pair.
#[derive(Debug, Clone)]
pub struct RiskSnapshot {
    pub student_id: i64,
    pub course_id: i64,
    pub risk_level: RiskLevel,
    pub attendance_percentage: f64,
    pub average_score: f64,
    pub factors: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

impl Model {
    /// Inserts or replaces the computed columns for the pair. Review bookkeeping
    /// (`notification_sent`, `intervention_notes`) survives recomputation.
    pub async fn upsert<C: ConnectionTrait>(db: &C, snapshot: RiskSnapshot) -> Result<Model, DbErr> {
        let (student_id, course_id) = (snapshot.student_id, snapshot.course_id);
        let active = ActiveModel {
            id: NotSet,
            student_id: Set(student_id),
            course_id: Set(course_id),
            risk_level: Set(snapshot.risk_level),
            attendance_percentage: Set(snapshot.attendance_percentage),
            average_score: Set(snapshot.average_score),
            factors: Set(Json::from(snapshot.factors)),
            calculated_at: Set(snapshot.calculated_at),
            notification_sent: Set(false),
            intervention_notes: Set(None),
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::columns([Column::StudentId, Column::CourseId])
                    .update_columns([
                        Column::RiskLevel,
                        Column::AttendancePercentage,
                        Column::AverageScore,
                        Column::Factors,
                        Column::CalculatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Self::find_by_pair(db, student_id, course_id)
            .await?
            .ok_or(DbErr::RecordNotFound(format!(
                "Risk assessment for student {student_id} in course {course_id} not found"
            )))
    }

    pub async fn find_by_pair<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .one(db)
            .await
    }

    pub async fn for_course<C: ConnectionTrait>(db: &C, course_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    /// Medium and high rows of a course: high first, then most recently calculated.
    pub async fn at_risk_for_course<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        let mut rows = Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::RiskLevel.is_in([RiskLevel::Medium, RiskLevel::High]))
            .all(db)
            .await?;

        rows.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| b.calculated_at.cmp(&a.calculated_at))
        });
        Ok(rows)
    }

    pub async fn count_at_risk_in_courses<C: ConnectionTrait>(
        db: &C,
        course_ids: &[i64],
    ) -> Result<u64, DbErr> {
        if course_ids.is_empty() {
            return Ok(0);
        }
        Entity::find()
            .filter(Column::CourseId.is_in(course_ids.iter().copied()))
            .filter(Column::RiskLevel.is_in([RiskLevel::Medium, RiskLevel::High]))
            .count(db)
            .await
    }

    pub async fn record_intervention<C: ConnectionTrait>(
        db: &C,
        id: i64,
        notes: Option<String>,
        notification_sent: bool,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Risk assessment {id} not found")))?
            .into();
        active.intervention_notes = Set(notes);
        active.notification_sent = Set(notification_sent);
        active.update(db).await
    }

    pub fn factors(&self) -> Vec<String> {
        self.factors
            .as_array()
            .map(|factors| {
                factors
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}
