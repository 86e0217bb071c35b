use db::models::{course, user};
use sea_orm::ConnectionTrait;

use crate::error::{AppError, AppResult};

pub(crate) async fn course<C: ConnectionTrait>(db: &C, course_id: i64) -> AppResult<course::Model> {
    course::Model::find_by_id(db, course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {course_id}")))
}

pub(crate) async fn user<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<user::Model> {
    user::Model::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id}")))
}
