//! Identity of whoever is calling into the engines. Authentication happens upstream; the
//! values here are trusted.

use db::models::course;
use db::models::user::UserRole;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: UserRole,
}

impl Caller {
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Course lecturer or an admin.
    pub fn require_course_staff(&self, course: &course::Model) -> AppResult<()> {
        if self.is_admin() || (self.role == UserRole::Lecturer && course.is_lecturer(self.user_id)) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "user {} does not manage course {}",
                self.user_id, course.code
            )))
        }
    }

    pub fn require_student(&self) -> AppResult<()> {
        if self.role == UserRole::Student {
            Ok(())
        } else {
            Err(AppError::Unauthorized("only students can submit attendance".into()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Unauthorized("admin role required".into()))
        }
    }

    /// Students may only read their own data; staff of the course may read anyone's.
    pub fn require_self_or_staff(&self, student_id: i64, course: &course::Model) -> AppResult<()> {
        if self.role == UserRole::Student {
            if self.user_id == student_id {
                Ok(())
            } else {
                Err(AppError::Unauthorized("students can only view their own records".into()))
            }
        } else {
            self.require_course_staff(course)
        }
    }
}
