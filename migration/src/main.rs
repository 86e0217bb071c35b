use common::config::Config;
use std::{env, fs, path::Path};

mod runner;

#[tokio::main]
async fn main() {
    let config = Config::init(".env");
    let url = config.database_url.clone();
    let db_file = sqlite_file(&url);
    let args: Vec<String> = env::args().collect();

    let outcome = match args.get(1).map(|s| s.as_str()) {
        Some("clean") => {
            if let Some(path) = &db_file {
                remove_db_file(path);
            }
            Ok(())
        }
        Some("fresh") => {
            if let Some(path) = &db_file {
                remove_db_file(path);
                create_db_dir(path);
            }
            runner::run_all_migrations(&url).await
        }
        _ => {
            if let Some(path) = &db_file {
                create_db_dir(path);
            }
            runner::run_all_migrations(&url).await
        }
    };

    if let Err(err) = outcome {
        eprintln!("Migration failed: {err}");
        std::process::exit(1);
    }
}

/// Extracts the file path from a `sqlite://path?opts` URL. In-memory and non-sqlite URLs yield `None`.
fn sqlite_file(url: &str) -> Option<String> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(path.to_string())
}

fn remove_db_file(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        match fs::remove_file(db_path) {
            Ok(()) => println!("Deleted DB: {}", db_path.display()),
            Err(err) => eprintln!("Failed to delete {}: {err}", db_path.display()),
        }
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn create_db_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!("Failed to create DB directory {}: {err}", parent.display());
        }
    }
}
