pub mod models;
pub mod test_utils;

use common::config::Config;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::Path;

/// Connects using `DATABASE_URL` from the global config.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    connect_to(&Config::get().database_url).await
}

/// Connects to `path_or_url`. A bare path is treated as a SQLite file and created on demand.
pub async fn connect_to(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url.to_string()
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);
    log::debug!("Connecting to {}", options.get_url());
    Database::connect(options).await
}
