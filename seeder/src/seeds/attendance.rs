use std::sync::Arc;

use crate::seed::Seeder;
use crate::seeds::{admin, all_courses, diligence};
use async_trait::async_trait;
use chrono::{Duration, DurationRound, Utc};
use common::config::Config;
use db::models::course_enrollment;
use db::models::user::UserRole;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::DatabaseConnection;
use services::AppResult;
use services::attendance::{AttendanceEngine, OsCodeSource, ReviewAction, SubmissionRequest};
use services::clock::{Clock, FixedClock};
use services::context::Caller;

const SESSIONS: i64 = 6;
const TOPICS: [&str; SESSIONS as usize] = [
    "Introduction",
    "Core concepts",
    "Worked examples",
    "Lab walkthrough",
    "Case study",
    "Revision",
];
const DEVICES: [&str; 3] = [
    "Mozilla/5.0 (Linux; Android 14) Mobile",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X)",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
];

/// Weekly sessions over the last few weeks, replayed on a fixed clock so timestamps look real.
pub struct AttendanceSeeder;

#[async_trait]
impl Seeder for AttendanceSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> AppResult<()> {
        let admin = admin(db).await?;
        let mut rng = StdRng::from_entropy();

        let start = Utc::now()
            .duration_trunc(Duration::days(1))
            .unwrap_or_else(|_| Utc::now())
            - Duration::weeks(SESSIONS)
            + Duration::hours(9);
        let clock = Arc::new(FixedClock::new(start));
        let engine = AttendanceEngine::new(
            Config::get().into(),
            clock.clone() as Arc<dyn Clock>,
            Arc::new(OsCodeSource),
        );

        for course in all_courses(db).await? {
            clock.set(start);
            let students = course_enrollment::Model::student_ids(db, course.id).await?;

            for topic in TOPICS {
                let generated = engine.generate_code(db, &admin, course.id, Some(topic)).await?;

                for &student_id in &students {
                    if !rng.gen_bool(diligence(student_id)) {
                        continue;
                    }
                    clock.advance(Duration::seconds(rng.gen_range(1..15)));

                    let ip = if rng.gen_bool(0.9) {
                        format!("10.20.{}.{}", rng.gen_range(0..16), rng.gen_range(2..255))
                    } else {
                        format!("102.89.{}.{}", rng.gen_range(0..255), rng.gen_range(2..255))
                    };
                    let device = DEVICES[rng.gen_range(0..DEVICES.len())];

                    engine
                        .submit(
                            db,
                            &Caller::new(student_id, UserRole::Student),
                            SubmissionRequest {
                                course_id: course.id,
                                code: &generated.code,
                                ip_address: Some(&ip),
                                device_info: Some(device),
                            },
                        )
                        .await?;
                }

                clock.set(generated.generated_at + Duration::weeks(1));
            }

            // Lecturer works through roughly half of the flagged queue.
            let flagged = engine.flagged_records(db, &admin, course.id).await?;
            let approve: Vec<i64> = flagged
                .iter()
                .filter(|_| rng.gen_bool(0.5))
                .map(|r| r.id)
                .collect();
            let changed = engine
                .bulk_review(
                    db,
                    &admin,
                    course.id,
                    &approve,
                    ReviewAction::Approve,
                    Some("Confirmed present in class"),
                )
                .await?;
            info!("{}: {} flagged, {} approved", course.code, flagged.len(), changed);
        }

        Ok(())
    }
}
