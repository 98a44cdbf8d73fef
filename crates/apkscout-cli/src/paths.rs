//! Filesystem locations for apkscout state.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the primary configuration directory, or None if the user's home cannot be resolved.
pub fn try_apkscout_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("APKSCOUT_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".apkscout"))
}

/// Returns the canonical apkscout home directory (`~/.apkscout`).
///
/// # Panics
///
/// Panics if neither `APKSCOUT_HOME` is set nor the user's home
/// directory can be resolved.
pub fn apkscout_home() -> PathBuf {
    try_apkscout_home().expect("Could not determine home directory. Set APKSCOUT_HOME to override.")
}

/// `SQLite` override-store path: ~/.apkscout/overrides.db
pub fn overrides_db_path() -> PathBuf {
    apkscout_home().join("overrides.db")
}
