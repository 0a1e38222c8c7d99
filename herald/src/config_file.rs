//! Locating `herald.config.ron`

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "HERALD_CONFIG";

/// Searched in order when no explicit file is given
pub const SEARCH_PATHS: [&str; 2] = ["./herald.config.ron", "/etc/herald/herald.config.ron"];

/// Find the configuration file for this process.
///
/// `HERALD_CONFIG` wins when set, and must name an existing file. Otherwise
/// the first of [`SEARCH_PATHS`] that exists is used.
///
/// # Errors
///
/// See [`locate`].
pub fn find() -> Result<PathBuf, ConfigError> {
    let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let candidates: Vec<PathBuf> = SEARCH_PATHS.iter().map(PathBuf::from).collect();
    locate(explicit, &candidates)
}

/// Pick `explicit` if given, else the first existing candidate.
///
/// # Errors
///
/// - [`ConfigError::MissingConfigFile`] if `explicit` does not exist
/// - [`ConfigError::NoConfigFile`] if no candidate exists
pub fn locate(explicit: Option<PathBuf>, candidates: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::MissingConfigFile(path))
        };
    }

    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::NoConfigFile {
            tried: candidates.to_vec(),
        })
}
