use crate::seed::Seeder;
use crate::seeds::{admin, all_courses, diligence};
use async_trait::async_trait;
use db::models::assessment::AssessmentType;
use db::models::{course_enrollment, user};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::DatabaseConnection;
use services::AppResult;
use services::assessment_service::{AssessmentService, BulkScoreRow};

/// Uploads each assessment type in turn the way a lecturer would, as a sheet of
/// `(username, score)` rows.
pub struct AssessmentSeeder;

const ROUNDS: [(AssessmentType, f64); 3] = [
    (AssessmentType::Ca1, 20.0),
    (AssessmentType::Ca2, 20.0),
    (AssessmentType::Midterm, 60.0),
];

#[async_trait]
impl Seeder for AssessmentSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let admin = admin(db).await?;
        let service = AssessmentService::default();
        let mut rng = StdRng::from_entropy();

        for course in all_courses(db).await? {
            let ids = course_enrollment::Model::student_ids(db, course.id).await?;
            let students = user::Model::find_many(db, &ids).await?;

            for (kind, max_score) in ROUNDS {
                let rows: Vec<BulkScoreRow> = students
                    .iter()
                    .map(|s| {
                        let base = diligence(s.id);
                        let fraction = (base + rng.gen_range(-0.25..0.1)).clamp(0.05, 1.0);
                        BulkScoreRow {
                            username: s.username.clone(),
                            score: format!("{:.1}", fraction * max_score),
                        }
                    })
                    .collect();

                service
                    .bulk_record(db, &admin, course.id, kind, max_score, &rows)
                    .await?;
            }
        }

        Ok(())
    }
}
