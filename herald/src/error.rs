use std::path::PathBuf;

use thiserror::Error;

/// Problems found in a host configuration before anything starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid dispatch configuration: {0}")]
    Dispatch(String),

    #[error("quota_reset_interval_secs must be greater than zero")]
    ZeroResetInterval,

    #[error("Campaign #{index} has no client id")]
    MissingClientId { index: usize },

    #[error("Campaign #{index} has no message template")]
    MissingTemplate { index: usize },

    #[error("HERALD_CONFIG points to non-existent file: {}", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("No configuration file found, tried HERALD_CONFIG and {}", display_paths(.tried))]
    NoConfigFile { tried: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
