use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs, str::FromStr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_url: String,
    /// Minutes an attendance code stays valid when the course sets no override.
    pub code_validity_minutes: i64,
    /// Campus network ranges (`a.b.c.d/n`) used when the course sets no override.
    pub campus_ip_ranges: Vec<String>,
    pub fast_submission_seconds: i64,
    pub burst_window_seconds: i64,
    pub burst_threshold: u64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Loads `env_path` (if present) into the environment and freezes the global config.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let config = Self::from_env();
            if let Some(parent) = std::path::Path::new(&config.log_file).parent() {
                fs::create_dir_all(parent).ok();
            }
            config
        })
    }

    /// Returns the global config, initializing it from the process environment on first use.
    pub fn get() -> &'static Self {
        CONFIG.get_or_init(Self::from_env)
    }

    pub fn from_env() -> Self {
        Config {
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "attendance-core".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/attendance.log".into()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/attendance.db?mode=rwc".into()),
            code_validity_minutes: parse_var("CODE_VALIDITY_MINUTES", 15),
            campus_ip_ranges: env::var("CAMPUS_IP_RANGES")
                .map(|raw| split_ranges(&raw))
                .unwrap_or_default(),
            fast_submission_seconds: parse_var("FAST_SUBMISSION_SECONDS", 5),
            burst_window_seconds: parse_var("BURST_WINDOW_SECONDS", 60),
            burst_threshold: parse_var("BURST_THRESHOLD", 5),
        }
    }
}

/// Splits a comma-separated range list, dropping blanks.
pub fn split_ranges(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
