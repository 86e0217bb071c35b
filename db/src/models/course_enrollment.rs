use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;

/// Links a student to a course. Composite key `(course_id, student_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "course_enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    pub enrolled_at: DateTime<Utc>,
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

impl Model {
    pub async fn enroll<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        student_id: i64,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            course_id: Set(course_id),
            student_id: Set(student_id),
            enrolled_at: Set(Utc::now()),
        };
        active.insert(db).await
    }

    pub async fn is_enrolled<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        student_id: i64,
    ) -> Result<bool, DbErr> {
        Ok(Entity::find_by_id((course_id, student_id))
            .one(db)
            .await?
            .is_some())
    }

    /// Student ids enrolled in a course, in enrollment order.
    pub async fn student_ids<C: ConnectionTrait>(db: &C, course_id: i64) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::StudentId)
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::EnrolledAt)
            .order_by_asc(Column::StudentId)
            .into_tuple::<i64>()
            .all(db)
            .await
    }

    pub async fn count<C: ConnectionTrait>(db: &C, course_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .count(db)
            .await
    }

    pub async fn course_ids_for_student<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::CourseId)
            .filter(Column::StudentId.eq(student_id))
            .order_by_asc(Column::CourseId)
            .into_tuple::<i64>()
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{self, NewCourse, Semester};
    use crate::models::user::{self, UserRole};
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_enroll_and_list() {
        let db = setup_test_db().await;
        let lect = user::Model::create(&db, "l", "l@x.com", "L", "L", UserRole::Lecturer, "CS")
            .await
            .unwrap();
        let s1 = user::Model::create(&db, "s1", "s1@x.com", "S", "1", UserRole::Student, "CS")
            .await
            .unwrap();
        let s2 = user::Model::create(&db, "s2", "s2@x.com", "S", "2", UserRole::Student, "CS")
            .await
            .unwrap();
        let c = course::Model::create(
            &db,
            NewCourse {
                code: "CSC300".into(),
                title: "Operating Systems".into(),
                department: "CS".into(),
                semester: Semester::Second,
                academic_year: "2024/2025".into(),
                credit_units: 3,
                lecturer_id: lect.id,
                max_students: None,
            },
        )
        .await
        .unwrap();

        Model::enroll(&db, c.id, s1.id).await.unwrap();
        Model::enroll(&db, c.id, s2.id).await.unwrap();

        assert!(Model::is_enrolled(&db, c.id, s1.id).await.unwrap());
        assert!(!Model::is_enrolled(&db, c.id, lect.id).await.unwrap());
        assert_eq!(Model::count(&db, c.id).await.unwrap(), 2);

        let mut ids = Model::student_ids(&db, c.id).await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![s1.id, s2.id]);
        assert_eq!(Model::course_ids_for_student(&db, s2.id).await.unwrap(), vec![c.id]);

        // Composite key rejects a second enrollment.
        assert!(Model::enroll(&db, c.id, s1.id).await.is_err());
    }
}
