pub mod aggregate;
pub mod assessment_service;
pub mod attendance;
pub mod clock;
pub mod context;
pub mod course_service;
pub mod error;
pub mod policy;
pub mod report_service;
pub mod risk;
pub mod user_service;

mod lookup;

pub use error::{AppError, AppResult};
