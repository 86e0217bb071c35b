//! Per-student attendance rows. One placeholder is created for every enrolled student when a
//! code is generated; the row is then written once by the student's submission and afterwards
//! only by lecturer review.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub session_date: DateTime<Utc>,
    pub session_topic: Option<String>,
    pub attendance_code: String,
    pub code_generated_at: DateTime<Utc>,
    pub code_expires_at: DateTime<Utc>,
    /// Set exactly once, by the student's submission.
    pub submission_time: Option<DateTime<Utc>>,
    pub verification_status: VerificationStatus,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    /// JSON array of human-readable reasons, in evaluation order.
    #[sea_orm(column_type = "JsonBinary")]
    pub flag_reasons: Json,
    pub reviewed_by: Option<i64>,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle: `absent -> {verified, flagged}` on submission, then
/// `-> {manual-approved, manual-rejected}` on review, any number of times.
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
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum VerificationStatus {
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "flagged")]
    Flagged,
    #[sea_orm(string_value = "manual-approved")]
    ManualApproved,
    #[sea_orm(string_value = "manual-rejected")]
    ManualRejected,
}

impl VerificationStatus {
    /// `verified` and `manual-approved` are the only statuses that count as attendance.
    pub fn counts_as_present(self) -> bool {
        matches!(self, Self::Verified | Self::ManualApproved)
    }
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

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Session-level fields shared by every placeholder of one code generation.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub course_id: i64,
    pub session_date: DateTime<Utc>,
    pub session_topic: Option<&'a str>,
    pub code: &'a str,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Fields written by a student's submission.
#[derive(Debug, Clone)]
pub struct SubmissionUpdate {
    pub submitted_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub status: VerificationStatus,
    pub flag_reasons: Vec<String>,
}

/// Fields written by a lecturer review.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub status: VerificationStatus,
    pub reviewer_id: i64,
    pub note: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewUpdate {
    fn apply(&self, active: &mut ActiveModel) {
        active.verification_status = Set(self.status);
        active.reviewed_by = Set(Some(self.reviewer_id));
        active.review_note = Set(self.note.clone());
        active.reviewed_at = Set(Some(self.reviewed_at));
        active.updated_at = Set(self.reviewed_at);
    }
}

impl Model {
    /// Inserts one `absent` row per student. Returns the number of rows written.
    pub async fn insert_placeholders<C: ConnectionTrait>(
        db: &C,
        session: &NewSession<'_>,
        student_ids: &[i64],
    ) -> Result<u64, DbErr> {
        if student_ids.is_empty() {
            return Ok(0);
        }

        let rows = student_ids.iter().map(|&student_id| ActiveModel {
            id: NotSet,
            course_id: Set(session.course_id),
            student_id: Set(student_id),
            session_date: Set(session.session_date),
            session_topic: Set(session.session_topic.map(str::to_owned)),
            attendance_code: Set(session.code.to_owned()),
            code_generated_at: Set(session.generated_at),
            code_expires_at: Set(session.expires_at),
            submission_time: Set(None),
            verification_status: Set(VerificationStatus::Absent),
            ip_address: Set(None),
            device_info: Set(None),
            flag_reasons: Set(Json::Array(Vec::new())),
            reviewed_by: Set(None),
            review_note: Set(None),
            reviewed_at: Set(None),
            created_at: Set(session.generated_at),
            updated_at: Set(session.generated_at),
        });

        Entity::insert_many(rows).exec_without_returning(db).await
    }

    /// The record a student would submit against: matching code and not yet expired at `now`.
    /// When several match, the most recently generated wins.
    pub async fn find_outstanding<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        student_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::AttendanceCode.eq(code))
            .filter(Column::CodeExpiresAt.gt(now))
            .order_by_desc(Column::CodeGeneratedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Submissions already recorded for `course_id` from `ip` at or after `since`.
    pub async fn count_recent_from_ip<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::IpAddress.eq(ip))
            .filter(Column::SubmissionTime.gte(since))
            .count(db)
            .await
    }

    /// Writes a submission only if the record has none yet.
    ///
    /// Returns `false` when another submission got there first; the row is left untouched.
    pub async fn record_submission<C: ConnectionTrait>(
        db: &C,
        id: i64,
        update: SubmissionUpdate,
    ) -> Result<bool, DbErr> {
        let patch = ActiveModel {
            submission_time: Set(Some(update.submitted_at)),
            verification_status: Set(update.status),
            ip_address: Set(update.ip_address),
            device_info: Set(update.device_info),
            flag_reasons: Set(Json::from(update.flag_reasons)),
            updated_at: Set(update.submitted_at),
            ..Default::default()
        };

        let result = Entity::update_many()
            .set(patch)
            .filter(Column::Id.eq(id))
            .filter(Column::SubmissionTime.is_null())
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn review<C: ConnectionTrait>(
        db: &C,
        id: i64,
        update: &ReviewUpdate,
    ) -> Result<Model, DbErr> {
        let mut active: ActiveModel = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Attendance record {id} not found")))?
            .into();
        update.apply(&mut active);
        active.update(db).await
    }

    /// Applies one review to many records of a course in a single statement.
    ///
    /// Records already in the target status are not touched, reviewer and note included, so
    /// the returned count is the number of statuses that actually changed.
    pub async fn bulk_review<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        ids: &[i64],
        update: &ReviewUpdate,
    ) -> Result<u64, DbErr> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut patch = <ActiveModel as Default>::default();
        update.apply(&mut patch);

        let result = Entity::update_many()
            .set(patch)
            .filter(Column::Id.is_in(ids.iter().copied()))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::VerificationStatus.ne(update.status))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Records of a course whose session falls in `[start, end)`.
    pub async fn for_course_between<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::SessionDate.gte(start))
            .filter(Column::SessionDate.lt(end))
            .order_by_asc(Column::SessionDate)
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    pub async fn flagged_for_course<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::VerificationStatus.eq(VerificationStatus::Flagged))
            .order_by_desc(Column::SessionDate)
            .order_by_desc(Column::SubmissionTime)
            .all(db)
            .await
    }

    /// A student's records in one course, newest session first.
    pub async fn for_student<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        course_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .order_by_desc(Column::SessionDate)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    /// All records of a course in session order. Either bound may be open; `end` is exclusive.
    pub async fn for_course<C: ConnectionTrait>(
        db: &C,
        course_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::CourseId.eq(course_id));
        if let Some(start) = start {
            query = query.filter(Column::SessionDate.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(Column::SessionDate.lt(end));
        }
        query
            .order_by_asc(Column::SessionDate)
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    pub fn flag_reasons(&self) -> Vec<String> {
        self.flag_reasons
            .as_array()
            .map(|reasons| {
                reasons
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_submitted(&self) -> bool {
        self.submission_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{self, NewCourse, Semester};
    use crate::models::user::{self, UserRole};
    use crate::test_utils::setup_test_db;
    use chrono::{Duration, TimeZone};
    use sea_orm::DatabaseConnection;

    struct Fixture {
        course_id: i64,
        lecturer_id: i64,
        students: Vec<i64>,
    }

    async fn fixture(db: &DatabaseConnection, n_students: usize) -> Fixture {
        let lect = user::Model::create(db, "lect", "lect@x.com", "L", "L", UserRole::Lecturer, "CS")
            .await
            .unwrap();
        let course = course::Model::create(
            db,
            NewCourse {
                code: "CSC310".into(),
                title: "Networks".into(),
                department: "CS".into(),
                semester: Semester::First,
                academic_year: "2024/2025".into(),
                credit_units: 3,
                lecturer_id: lect.id,
                max_students: None,
            },
        )
        .await
        .unwrap();

        let mut students = Vec::new();
        for i in 0..n_students {
            let s = user::Model::create(
                db,
                &format!("s{i}"),
                &format!("s{i}@x.com"),
                "S",
                "T",
                UserRole::Student,
                "CS",
            )
            .await
            .unwrap();
            students.push(s.id);
        }

        Fixture { course_id: course.id, lecturer_id: lect.id, students }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    async fn open_session(db: &DatabaseConnection, f: &Fixture, code: &str, at: DateTime<Utc>) {
        let session = NewSession {
            course_id: f.course_id,
            session_date: at,
            session_topic: Some("Routing"),
            code,
            generated_at: at,
            expires_at: at + Duration::minutes(15),
        };
        let n = Model::insert_placeholders(db, &session, &f.students).await.unwrap();
        assert_eq!(n as usize, f.students.len());
    }

    fn submission(at: DateTime<Utc>, ip: &str, status: VerificationStatus) -> SubmissionUpdate {
        SubmissionUpdate {
            submitted_at: at,
            ip_address: Some(ip.into()),
            device_info: Some("test-agent".into()),
            status,
            flag_reasons: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_placeholders_start_absent() {
        let db = setup_test_db().await;
        let f = fixture(&db, 3).await;
        open_session(&db, &f, "123456", t0()).await;

        let rows = Model::for_course(&db, f.course_id, None, None).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.verification_status == VerificationStatus::Absent));
        assert!(rows.iter().all(|r| !r.is_submitted() && r.flag_reasons().is_empty()));
        assert!(rows.iter().all(|r| r.code_expires_at - r.code_generated_at == Duration::minutes(15)));
    }

    #[tokio::test]
    async fn test_insert_placeholders_with_no_students() {
        let db = setup_test_db().await;
        let f = fixture(&db, 0).await;
        let session = NewSession {
            course_id: f.course_id,
            session_date: t0(),
            session_topic: None,
            code: "111111",
            generated_at: t0(),
            expires_at: t0() + Duration::minutes(15),
        };
        assert_eq!(Model::insert_placeholders(&db, &session, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_outstanding_respects_expiry_and_code() {
        let db = setup_test_db().await;
        let f = fixture(&db, 1).await;
        open_session(&db, &f, "654321", t0()).await;
        let student = f.students[0];

        let during = t0() + Duration::minutes(5);
        assert!(
            Model::find_outstanding(&db, f.course_id, student, "654321", during)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            Model::find_outstanding(&db, f.course_id, student, "000000", during)
                .await
                .unwrap()
                .is_none()
        );

        let at_expiry = t0() + Duration::minutes(15);
        assert!(
            Model::find_outstanding(&db, f.course_id, student, "654321", at_expiry)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_submission_only_once() {
        let db = setup_test_db().await;
        let f = fixture(&db, 1).await;
        open_session(&db, &f, "222222", t0()).await;
        let rec = Model::find_outstanding(&db, f.course_id, f.students[0], "222222", t0())
            .await
            .unwrap()
            .unwrap();

        let at = t0() + Duration::minutes(1);
        let mut first = submission(at, "10.20.1.1", VerificationStatus::Flagged);
        first.flag_reasons = vec!["Unusually fast submission".into()];
        assert!(Model::record_submission(&db, rec.id, first).await.unwrap());

        let later = at + Duration::minutes(1);
        let second = submission(later, "10.20.1.2", VerificationStatus::Verified);
        assert!(!Model::record_submission(&db, rec.id, second).await.unwrap());

        let stored = Model::for_student(&db, f.students[0], f.course_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].submission_time, Some(at));
        assert_eq!(stored[0].verification_status, VerificationStatus::Flagged);
        assert_eq!(stored[0].ip_address.as_deref(), Some("10.20.1.1"));
        assert_eq!(stored[0].flag_reasons(), vec!["Unusually fast submission".to_string()]);
    }

    #[tokio::test]
    async fn test_count_recent_from_ip_uses_window() {
        let db = setup_test_db().await;
        let f = fixture(&db, 3).await;
        open_session(&db, &f, "333333", t0()).await;
        let records = Model::for_course(&db, f.course_id, None, None).await.unwrap();

        let times = [
            t0() + Duration::seconds(10),
            t0() + Duration::seconds(100),
            t0() + Duration::seconds(110),
        ];
        for (rec, at) in records.iter().zip(times) {
            Model::record_submission(&db, rec.id, submission(at, "10.20.0.9", VerificationStatus::Verified))
                .await
                .unwrap();
        }

        let now = t0() + Duration::seconds(120);
        let since = now - Duration::seconds(60);
        assert_eq!(
            Model::count_recent_from_ip(&db, f.course_id, "10.20.0.9", since).await.unwrap(),
            2
        );
        assert_eq!(
            Model::count_recent_from_ip(&db, f.course_id, "10.20.0.8", since).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_review_sets_reviewer_fields() {
        let db = setup_test_db().await;
        let f = fixture(&db, 1).await;
        open_session(&db, &f, "444444", t0()).await;
        let rec = &Model::for_course(&db, f.course_id, None, None).await.unwrap()[0];

        let when = t0() + Duration::hours(2);
        let reviewed = Model::review(
            &db,
            rec.id,
            &ReviewUpdate {
                status: VerificationStatus::ManualApproved,
                reviewer_id: f.lecturer_id,
                note: Some("Was in the room".into()),
                reviewed_at: when,
            },
        )
        .await
        .unwrap();

        assert_eq!(reviewed.verification_status, VerificationStatus::ManualApproved);
        assert_eq!(reviewed.reviewed_by, Some(f.lecturer_id));
        assert_eq!(reviewed.reviewed_at, Some(when));
        assert!(reviewed.verification_status.counts_as_present());
    }

    #[tokio::test]
    async fn test_bulk_review_counts_only_changes_in_course() {
        let db = setup_test_db().await;
        let f = fixture(&db, 3).await;
        open_session(&db, &f, "555555", t0()).await;
        let recs = Model::for_course(&db, f.course_id, None, None).await.unwrap();
        let ids: Vec<i64> = recs.iter().map(|r| r.id).collect();

        let update = ReviewUpdate {
            status: VerificationStatus::ManualRejected,
            reviewer_id: f.lecturer_id,
            note: None,
            reviewed_at: t0() + Duration::hours(1),
        };

        Model::review(&db, ids[0], &update).await.unwrap();

        let changed = Model::bulk_review(&db, f.course_id, &ids, &update).await.unwrap();
        assert_eq!(changed, 2);

        // Wrong course: nothing matches.
        assert_eq!(Model::bulk_review(&db, f.course_id + 1, &ids, &update).await.unwrap(), 0);
        assert_eq!(Model::bulk_review(&db, f.course_id, &[], &update).await.unwrap(), 0);
    }

    #[test]
    fn test_status_strings() {
        use std::str::FromStr;
        assert_eq!(VerificationStatus::ManualApproved.to_string(), "manual-approved");
        assert_eq!(
            VerificationStatus::from_str("manual-rejected").unwrap(),
            VerificationStatus::ManualRejected
        );
        assert!(!VerificationStatus::Flagged.counts_as_present());
        assert!(VerificationStatus::Verified.counts_as_present());
    }
}
