//! Typed failure values.
//!
//! Nothing in the engine is fatal: these are returned so a host can tell the
//! failure modes apart and decide what to show the user.

use std::path::PathBuf;
use thiserror::Error;

/// A locator string that does not yield a usable path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("locator is empty")]
    Empty,
    #[error("locator {0:?} does not contain a file path")]
    MissingPath(String),
}

/// Failure reading or writing the per-workspace config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A file the scanner had to skip.
#[derive(Debug, Error)]
#[error("failed to read {}: {source}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
