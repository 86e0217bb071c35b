use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One graded piece of work for a student in a course.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "assessments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub assessment_type: AssessmentType,
    pub score: f64,
    pub max_score: f64,
    /// Always `score / max_score * 100`, or 0 when `max_score` is not positive.
    pub percentage: f64,
    pub submission_date: DateTime<Utc>,
    pub entered_by: i64,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
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
pub enum AssessmentType {
    #[sea_orm(string_value = "ca1")]
    Ca1,
    #[sea_orm(string_value = "ca2")]
    Ca2,
    #[sea_orm(string_value = "midterm")]
    Midterm,
    #[sea_orm(string_value = "exam")]
    Exam,
    #[sea_orm(string_value = "assignment")]
    Assignment,
    #[sea_orm(string_value = "project")]
    Project,
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

pub fn compute_percentage(score: f64, max_score: f64) -> f64 {
    if max_score > 0.0 {
        score / max_score * 100.0
    } else {
        0.0
    }
}

/// Input for a single new assessment row.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub course_id: i64,
    pub student_id: i64,
    pub assessment_type: AssessmentType,
    pub score: f64,
    pub max_score: f64,
    pub submission_date: DateTime<Utc>,
    pub entered_by: i64,
    pub remarks: Option<String>,
}

impl NewAssessment {
    fn into_active(self, now: DateTime<Utc>) -> ActiveModel {
        ActiveModel {
            id: NotSet,
            course_id: Set(self.course_id),
            student_id: Set(self.student_id),
            assessment_type: Set(self.assessment_type),
            score: Set(self.score),
            max_score: Set(self.max_score),
            percentage: Set(compute_percentage(self.score, self.max_score)),
            submission_date: Set(self.submission_date),
            entered_by: Set(self.entered_by),
            remarks: Set(self.remarks),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, new: NewAssessment) -> Result<Model, DbErr> {
        new.into_active(Utc::now()).insert(db).await
    }

    /// Inserts all rows in one statement. Returns the number written.
    pub async fn insert_many<C: ConnectionTrait>(
        db: &C,
        rows: Vec<NewAssessment>,
    ) -> Result<u64, DbErr> {
        if rows.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        Entity::insert_many(rows.into_iter().map(|r| r.into_active(now)))
            .exec_without_returning(db)
            .await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Updates any of score, max score and remarks. The percentage is recomputed from the
    /// resulting pair.
    pub async fn update_scores<C: ConnectionTrait>(
        db: &C,
        id: i64,
        score: Option<f64>,
        max_score: Option<f64>,
        remarks: Option<String>,
    ) -> Result<Model, DbErr> {
        let existing = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Assessment {id} not found")))?;

        let score = score.unwrap_or(existing.score);
        let max_score = max_score.unwrap_or(existing.max_score);
        let remarks = remarks.or_else(|| existing.remarks.clone());

        let mut active: ActiveModel = existing.into();
        active.score = Set(score);
        active.max_score = Set(max_score);
        active.percentage = Set(compute_percentage(score, max_score));
        active.remarks = Set(remarks);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Returns `true` if a row was removed.
    pub async fn delete_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Assessments of a course, newest first, optionally of one type.
    pub async fn for_course<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        assessment_type: Option<AssessmentType>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::CourseId.eq(course_id));
        if let Some(kind) = assessment_type {
            query = query.filter(Column::AssessmentType.eq(kind));
        }
        query
            .order_by_desc(Column::SubmissionDate)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    /// A student's assessments in one course, oldest first.
    pub async fn for_student<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::SubmissionDate)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// A student's assessments across courses, oldest first, optionally limited to one course.
    pub async fn for_student_all<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        course_id: Option<i64>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::StudentId.eq(student_id));
        if let Some(course_id) = course_id {
            query = query.filter(Column::CourseId.eq(course_id));
        }
        query
            .order_by_asc(Column::CourseId)
            .order_by_asc(Column::SubmissionDate)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}
