mod helpers;

use chrono::Duration;
use db::models::attendance_record::{self, VerificationStatus};
use db::models::course;
use helpers::{world, CAMPUS_IP, OFF_CAMPUS_IP};
use services::attendance::heuristics::{FAST_SUBMISSION, OFF_CAMPUS, SHARED_IP_BURST};
use services::attendance::{ReviewAction, SubmissionRequest, FLAGGED_NOTE};
use services::clock::Clock;
use services::AppError;

fn request<'a>(course_id: i64, code: &'a str, ip: Option<&'a str>) -> SubmissionRequest<'a> {
    SubmissionRequest {
        course_id,
        code,
        ip_address: ip,
        device_info: Some("Mozilla/5.0 (test)"),
    }
}

#[tokio::test]
async fn test_generate_creates_placeholder_per_student() {
    let w = world(4).await;

    let generated = w
        .engine
        .generate_code(&w.db, &w.lecturer, w.course.id, Some("Intro"))
        .await
        .unwrap();

    assert_eq!(generated.code, "100000");
    assert_eq!(generated.students_count, 4);
    assert_eq!(generated.validity_minutes, 15);
    assert_eq!(generated.expires_at - generated.generated_at, Duration::minutes(15));

    let rows = attendance_record::Model::for_course(&w.db, w.course.id, None, None).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.verification_status == VerificationStatus::Absent));
    assert!(rows.iter().all(|r| r.session_topic.as_deref() == Some("Intro")));
}

#[tokio::test]
async fn test_generate_requires_course_staff() {
    let w = world(1).await;

    let err = w
        .engine
        .generate_code(&w.db, &w.other_lecturer, w.course.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = w
        .engine
        .generate_code(&w.db, &w.students[0], w.course.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    assert!(w.engine.generate_code(&w.db, &w.admin, w.course.id, None).await.is_ok());

    let err = w.engine.generate_code(&w.db, &w.admin, 9_999, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_course_override_changes_validity() {
    let w = world(1).await;
    course::Model::set_attendance_settings(&w.db, w.course.id, Some(5), None)
        .await
        .unwrap();

    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    assert_eq!(generated.validity_minutes, 5);

    w.clock.advance(Duration::minutes(6));
    let err = w
        .engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpired));
}

#[tokio::test]
async fn test_clean_submission_is_verified() {
    let w = world(2).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();

    w.clock.advance(Duration::seconds(30));
    let outcome = w
        .engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap();

    assert_eq!(outcome.status, VerificationStatus::Verified);
    assert!(outcome.flag_reasons.is_empty());
    assert!(outcome.note.is_none());

    let rows =
        attendance_record::Model::for_student(&w.db, w.students[0].user_id, w.course.id).await.unwrap();
    assert_eq!(rows[0].submission_time, Some(helpers::t0() + Duration::seconds(30)));
    assert_eq!(rows[0].ip_address.as_deref(), Some(CAMPUS_IP));
    assert_eq!(rows[0].device_info.as_deref(), Some("Mozilla/5.0 (test)"));
}

#[tokio::test]
async fn test_off_campus_and_fast_submission_are_flagged() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();

    w.clock.advance(Duration::seconds(2));
    let outcome = w
        .engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, Some(OFF_CAMPUS_IP)))
        .await
        .unwrap();

    assert_eq!(outcome.status, VerificationStatus::Flagged);
    assert_eq!(outcome.flag_reasons, vec![OFF_CAMPUS, FAST_SUBMISSION]);
    assert_eq!(outcome.note, Some(FLAGGED_NOTE));

    let stored = &attendance_record::Model::for_student(&w.db, w.students[0].user_id, w.course.id)
        .await
        .unwrap()[0];
    assert_eq!(stored.flag_reasons(), outcome.flag_reasons);
}

#[tokio::test]
async fn test_missing_ip_counts_as_off_campus() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(30));

    let outcome = w
        .engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, None))
        .await
        .unwrap();
    assert_eq!(outcome.flag_reasons, vec![OFF_CAMPUS]);
}

#[tokio::test]
async fn test_second_submission_is_rejected() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(30));

    let student = &w.students[0];
    w.engine
        .submit(&w.db, student, request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap();

    w.clock.advance(Duration::seconds(30));
    let err = w
        .engine
        .submit(&w.db, student, request(w.course.id, &generated.code, Some(OFF_CAMPUS_IP)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadySubmitted));

    let stored = &attendance_record::Model::for_student(&w.db, student.user_id, w.course.id)
        .await
        .unwrap()[0];
    assert_eq!(stored.verification_status, VerificationStatus::Verified);
    assert_eq!(stored.ip_address.as_deref(), Some(CAMPUS_IP));
}

#[tokio::test]
async fn test_wrong_or_expired_code_changes_nothing() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    let student = &w.students[0];
    w.clock.advance(Duration::seconds(30));

    let err = w
        .engine
        .submit(&w.db, student, request(w.course.id, "999999", Some(CAMPUS_IP)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpired));

    w.clock.advance(Duration::minutes(15));
    let err = w
        .engine
        .submit(&w.db, student, request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpired));

    let stored = &attendance_record::Model::for_student(&w.db, student.user_id, w.course.id)
        .await
        .unwrap()[0];
    assert_eq!(stored.verification_status, VerificationStatus::Absent);
    assert!(stored.submission_time.is_none());
    assert!(stored.ip_address.is_none());
}

#[tokio::test]
async fn test_only_students_submit() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();

    let err = w
        .engine
        .submit(&w.db, &w.lecturer, request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_burst_from_one_address_is_flagged() {
    let w = world(7).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(10));

    let mut outcomes = Vec::new();
    for student in &w.students {
        w.clock.advance(Duration::seconds(1));
        outcomes.push(
            w.engine
                .submit(&w.db, student, request(w.course.id, &generated.code, Some(CAMPUS_IP)))
                .await
                .unwrap(),
        );
    }

    // Submissions 1..=6 see at most five earlier ones; the seventh sees six.
    assert!(outcomes[..6].iter().all(|o| o.status == VerificationStatus::Verified));
    assert_eq!(outcomes[6].status, VerificationStatus::Flagged);
    assert_eq!(outcomes[6].flag_reasons, vec![SHARED_IP_BURST]);
}

#[tokio::test]
async fn test_burst_window_expires() {
    let w = world(7).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(10));

    for student in &w.students[..6] {
        w.engine
            .submit(&w.db, student, request(w.course.id, &generated.code, Some(CAMPUS_IP)))
            .await
            .unwrap();
    }

    w.clock.advance(Duration::seconds(61));
    let outcome = w
        .engine
        .submit(&w.db, &w.students[6], request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap();
    assert_eq!(outcome.status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_concurrent_submissions_write_once() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(30));
    let student = &w.students[0];

    let (a, b) = tokio::join!(
        w.engine
            .submit(&w.db, student, request(w.course.id, &generated.code, Some(CAMPUS_IP))),
        w.engine
            .submit(&w.db, student, request(w.course.id, &generated.code, Some(OFF_CAMPUS_IP))),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::AlreadySubmitted))));
}

#[tokio::test]
async fn test_review_overrides_status() {
    let w = world(1).await;
    let generated = w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.clock.advance(Duration::seconds(30));
    let outcome = w
        .engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, Some(OFF_CAMPUS_IP)))
        .await
        .unwrap();
    assert_eq!(outcome.status, VerificationStatus::Flagged);

    let err = w
        .engine
        .review(&w.db, &w.other_lecturer, outcome.record_id, ReviewAction::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    w.clock.advance(Duration::hours(1));
    let approved = w
        .engine
        .review(&w.db, &w.lecturer, outcome.record_id, ReviewAction::Approve, Some("Seen in class"))
        .await
        .unwrap();
    assert_eq!(approved.verification_status, VerificationStatus::ManualApproved);
    assert_eq!(approved.reviewed_by, Some(w.lecturer.user_id));
    assert_eq!(approved.review_note.as_deref(), Some("Seen in class"));
    assert_eq!(approved.reviewed_at, Some(w.clock.now()));
    // Submission data is untouched by review.
    assert_eq!(approved.flag_reasons(), vec![OFF_CAMPUS]);

    let rejected = w
        .engine
        .review(&w.db, &w.admin, outcome.record_id, ReviewAction::Reject, None)
        .await
        .unwrap();
    assert_eq!(rejected.verification_status, VerificationStatus::ManualRejected);

    let err = w
        .engine
        .review(&w.db, &w.lecturer, 424_242, ReviewAction::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_bulk_review_counts_changes() {
    let w = world(3).await;
    w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    let ids: Vec<i64> = attendance_record::Model::for_course(&w.db, w.course.id, None, None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    let mut with_duplicates = ids.clone();
    with_duplicates.push(ids[0]);
    let changed = w
        .engine
        .bulk_review(&w.db, &w.lecturer, w.course.id, &with_duplicates, ReviewAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(changed, 3);

    let again = w
        .engine
        .bulk_review(&w.db, &w.lecturer, w.course.id, &ids, ReviewAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(again, 0);

    let partial = w
        .engine
        .bulk_review(&w.db, &w.lecturer, w.course.id, &ids[..2], ReviewAction::Reject, Some("No"))
        .await
        .unwrap();
    assert_eq!(partial, 2);

    let err = w
        .engine
        .bulk_review(&w.db, &w.other_lecturer, w.course.id, &ids, ReviewAction::Reject, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_bulk_review_ignores_other_courses() {
    let w = world(2).await;
    let other = helpers::create_course(&w.db, "CSC999", w.other_lecturer.user_id).await;
    db::models::course_enrollment::Model::enroll(&w.db, other.id, w.students[0].user_id)
        .await
        .unwrap();

    w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    w.engine.generate_code(&w.db, &w.other_lecturer, other.id, None).await.unwrap();

    let foreign: Vec<i64> = attendance_record::Model::for_course(&w.db, other.id, None, None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    let changed = w
        .engine
        .bulk_review(&w.db, &w.lecturer, w.course.id, &foreign, ReviewAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(changed, 0);
}

#[tokio::test]
async fn test_session_stats_and_summary() {
    let w = world(3).await;
    let day_one = helpers::t0().date_naive();
    let generated = w
        .engine
        .generate_code(&w.db, &w.lecturer, w.course.id, Some("Ownership"))
        .await
        .unwrap();
    w.clock.advance(Duration::seconds(30));

    w.engine
        .submit(&w.db, &w.students[0], request(w.course.id, &generated.code, Some(CAMPUS_IP)))
        .await
        .unwrap();
    w.clock.advance(Duration::seconds(30));
    w.engine
        .submit(&w.db, &w.students[1], request(w.course.id, &generated.code, Some(OFF_CAMPUS_IP)))
        .await
        .unwrap();

    let session = w
        .engine
        .session_attendance(&w.db, &w.lecturer, w.course.id, day_one)
        .await
        .unwrap();
    assert_eq!(session.stats.total, 3);
    assert_eq!(session.stats.present, 1);
    assert_eq!(session.stats.flagged, 1);
    assert_eq!(session.stats.absent, 1);
    assert_eq!(session.records[0].student_id, w.students[1].user_id);
    assert!(session.records[2].submission_time.is_none());

    let flagged = w.engine.flagged_records(&w.db, &w.lecturer, w.course.id).await.unwrap();
    assert_eq!(flagged.len(), 1);

    // Second session a day later, nobody submits.
    w.clock.advance(Duration::days(1));
    w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();

    let summary = w
        .engine
        .attendance_summary(&w.db, &w.lecturer, w.course.id, None, None)
        .await
        .unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].date, day_one);
    assert_eq!(summary[0].topic.as_deref(), Some("Ownership"));
    assert_eq!((summary[0].present, summary[0].flagged, summary[0].absent), (1, 1, 1));
    assert_eq!((summary[1].present, summary[1].absent), (0, 3));

    let only_first = w
        .engine
        .attendance_summary(&w.db, &w.lecturer, w.course.id, Some(day_one), Some(day_one))
        .await
        .unwrap();
    assert_eq!(only_first.len(), 1);

    let next = day_one.succ_opt().unwrap();
    let err = w
        .engine
        .attendance_summary(&w.db, &w.lecturer, w.course.id, Some(next), Some(day_one))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stats = w
        .engine
        .student_stats(&w.db, &w.students[0], w.students[0].user_id, w.course.id)
        .await
        .unwrap();
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.present_count, 1);
    assert_eq!(stats.absent_count, 1);
    assert_eq!(stats.attendance_percentage, 50.0);

    let err = w
        .engine
        .student_stats(&w.db, &w.students[1], w.students[0].user_id, w.course.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_bulk_review_keeps_earlier_review_of_unchanged_rows() {
    let w = world(2).await;
    w.engine.generate_code(&w.db, &w.lecturer, w.course.id, None).await.unwrap();
    let ids: Vec<i64> = attendance_record::Model::for_course(&w.db, w.course.id, None, None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    let first = w
        .engine
        .review(&w.db, &w.lecturer, ids[0], ReviewAction::Approve, Some("Seen in class"))
        .await
        .unwrap();

    w.clock.advance(Duration::hours(1));
    let changed = w
        .engine
        .bulk_review(&w.db, &w.admin, w.course.id, &ids, ReviewAction::Approve, Some("Batch"))
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let rows = attendance_record::Model::for_course(&w.db, w.course.id, None, None).await.unwrap();
    let kept = rows.iter().find(|r| r.id == ids[0]).unwrap();
    assert_eq!(kept.reviewed_by, Some(w.lecturer.user_id));
    assert_eq!(kept.review_note.as_deref(), Some("Seen in class"));
    assert_eq!(kept.reviewed_at, first.reviewed_at);

    let batched = rows.iter().find(|r| r.id == ids[1]).unwrap();
    assert_eq!(batched.verification_status, VerificationStatus::ManualApproved);
    assert_eq!(batched.reviewed_by, Some(w.admin.user_id));
    assert_eq!(batched.review_note.as_deref(), Some("Batch"));
}
