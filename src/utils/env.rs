//! Database path from the environment: `LOCFLOW_DB` → `.env` in the working directory.

use std::path::{Path, PathBuf};

use super::config::PackagePaths;

fn non_empty_var(key: &str) -> Option<String> {
    let s = std::env::var(key).ok()?;
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

/// Database path from `LOCFLOW_DB`, loading `dir/.env` first if the variable is not already set.
pub fn db_path_from_env(dir: &Path) -> Option<PathBuf> {
    let key = PackagePaths::get().db_env_key();
    if let Some(s) = non_empty_var(key) {
        return Some(PathBuf::from(s));
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Some(s) = non_empty_var(key) {
            log::debug!("database path from {}", env_path.display());
            return Some(PathBuf::from(s));
        }
    }
    None
}
