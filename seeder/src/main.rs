use crate::seed::{Seeder, run_seeder};
use crate::seeds::{
    assessment::AssessmentSeeder, attendance::AttendanceSeeder, course::CourseSeeder,
    enrollment::EnrollmentSeeder, risk::RiskSeeder, user::UserSeeder,
};
use common::config::Config;
use common::logger::init_logger;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;

mod seed;
mod seeds;

#[tokio::main]
async fn main() {
    let config = Config::init(".env");
    if let Err(err) = init_logger(&config.log_level, &config.log_file) {
        eprintln!("Failed to initialize logger: {err}");
    }

    let db = match db::connect().await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("Failed to connect to {}: {err}", config.database_url);
            std::process::exit(1);
        }
    };
    if let Err(err) = Migrator::up(&db, None).await {
        eprintln!("Migration failed: {err}");
        std::process::exit(1);
    }

    for (seeder, name) in [
        (Box::new(UserSeeder) as Box<dyn Seeder + Send + Sync>, "User"),
        (Box::new(CourseSeeder), "Course"),
        (Box::new(EnrollmentSeeder), "Enrollment"),
        (Box::new(AttendanceSeeder), "Attendance"),
        (Box::new(AssessmentSeeder), "Assessment"),
        (Box::new(RiskSeeder), "Risk"),
    ] {
        run_seeder(&*seeder, name, &db).await;
    }
}
