use db::models::user;
use log::info;
use sea_orm::ConnectionTrait;

use crate::context::Caller;
use crate::error::{AppError, AppResult};
use crate::lookup;

#[derive(Debug, Default, Clone, Copy)]
pub struct UserService;

impl UserService {
    /// Activates or deactivates an account. Admin only; admins cannot deactivate themselves.
    pub async fn set_status<C: ConnectionTrait>(
        &self,
        db: &C,
        caller: &Caller,
        user_id: i64,
        is_active: bool,
    ) -> AppResult<user::Model> {
        caller.require_admin()?;
        if !is_active && caller.user_id == user_id {
            return Err(AppError::Validation("admins cannot deactivate their own account".into()));
        }
        let target = lookup::user(db, user_id).await?;

        let updated = user::Model::set_active(db, target.id, is_active).await?;
        info!(
            "User {} {} by admin {}",
            updated.username,
            if is_active { "activated" } else { "deactivated" },
            caller.user_id
        );
        Ok(updated)
    }
}
