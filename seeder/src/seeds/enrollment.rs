use crate::seed::Seeder;
use crate::seeds::{admin, all_courses};
use async_trait::async_trait;
use db::models::user::{self, UserRole};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use services::AppResult;
use services::course_service::CourseService;

pub struct EnrollmentSeeder;

#[async_trait]
impl Seeder for EnrollmentSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let admin = admin(db).await?;
        let mut rng = StdRng::from_entropy();

        for course in all_courses(db).await? {
            let candidates = user::Entity::find()
                .filter(user::Column::Role.eq(UserRole::Student))
                .filter(user::Column::Department.eq(course.department.clone()))
                .all(db)
                .await?;

            let picked: Vec<i64> = candidates
                .iter()
                .filter(|_| rng.gen_bool(0.85))
                .map(|s| s.id)
                .collect();

            let result = CourseService
                .enroll_students(db, &admin, course.id, &picked)
                .await?;
            info!(
                "{}: {} enrolled, {} rejected",
                course.code,
                result.enrolled.len(),
                result.rejected.len()
            );
        }

        Ok(())
    }
}
