use crate::seed::Seeder;
use crate::seeds::ADMIN_USERNAME;
use async_trait::async_trait;
use db::models::user::{Model, UserRole};
use fake::{
    Fake,
    faker::name::en::{FirstName, LastName},
};
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sea_orm::DatabaseConnection;
use services::AppResult;

pub const DEPARTMENTS: [&str; 2] = ["Computer Science", "Mathematics"];

pub struct UserSeeder;

#[async_trait]
impl Seeder for UserSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let mut rng = StdRng::from_entropy();

        // Fixed admin
        Model::create(
            db,
            ADMIN_USERNAME,
            "admin@uni.example.edu",
            "Ada",
            "Admin",
            UserRole::Admin,
            DEPARTMENTS[0],
        )
        .await?;

        // Fixed lecturers, the last one in Mathematics
        for n in 1..=4 {
            let username = format!("lect{:02}", n);
            let first: String = FirstName().fake();
            let last: String = LastName().fake();
            let department = if n == 4 { DEPARTMENTS[1] } else { DEPARTMENTS[0] };
            Model::create(
                db,
                &username,
                &format!("{username}@uni.example.edu"),
                &first,
                &last,
                UserRole::Lecturer,
                department,
            )
            .await?;
        }

        // Random students
        for n in 1..=48 {
            let username = format!("u{:04}", n);
            let first: String = FirstName().fake();
            let last: String = LastName().fake();
            let department = if rng.gen_bool(0.75) { DEPARTMENTS[0] } else { DEPARTMENTS[1] };
            Model::create(
                db,
                &username,
                &format!("{username}@students.example.edu"),
                &first,
                &last,
                UserRole::Student,
                department,
            )
            .await?;
        }

        Ok(())
    }
}
