use crate::seed::Seeder;
use crate::seeds::{admin, all_courses};
use async_trait::async_trait;
use log::info;
use sea_orm::DatabaseConnection;
use services::AppResult;
use services::risk::RiskEngine;

pub struct RiskSeeder;

#[async_trait]
impl Seeder for RiskSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let admin = admin(db).await?;
        let engine = RiskEngine::default();

        for course in all_courses(db).await? {
            let report = engine.assess_course(db, &admin, course.id).await?;

            if let Some(worst) = report
                .assessments
                .iter()
                .max_by(|a, b| a.risk_level.cmp(&b.risk_level))
            {
                info!("{}: highest risk is {}", course.code, worst.risk_level);
            }
        }

        Ok(())
    }
}
