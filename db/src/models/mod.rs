pub mod assessment;
pub mod attendance_record;
pub mod course;
pub mod course_enrollment;
pub mod risk_assessment;
pub mod user;

pub use assessment::Entity as Assessment;
pub use attendance_record::Entity as AttendanceRecord;
pub use course::Entity as Course;
pub use course_enrollment::Entity as CourseEnrollment;
pub use risk_assessment::Entity as RiskAssessment;
pub use user::Entity as User;
