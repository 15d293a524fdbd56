//! Core types for the Endpointer index.
//!
//! This module defines the value types every other layer passes around:
//! - Tagged declarations and calls produced by a scan
//! - The `(method, endpoint)` key used for cross-referencing
//! - Source locators pointing back into the workspace

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Locators
// ============================================================================

/// A navigable reference to a file and, optionally, a 0-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocator {
    pub path: PathBuf,
    pub line: Option<u32>,
}

impl SourceLocator {
    pub fn new(path: impl Into<PathBuf>, line: Option<u32>) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    pub fn at_line(path: impl Into<PathBuf>, line: u32) -> Self {
        Self::new(path, Some(line))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, None)
    }
}

// ============================================================================
// Route keys
// ============================================================================

/// The exact-match key linking a frontend call to a backend declaration.
///
/// The method is uppercased on construction; the endpoint is kept as captured
/// apart from a guaranteed leading `/`. `/users/:id` and `/users/42` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub method: String,
    pub endpoint: String,
}

impl RouteKey {
    pub fn new(method: &str, endpoint: &str) -> Self {
        Self {
            method: method.trim().to_uppercase(),
            endpoint: with_leading_slash(endpoint.trim()),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)
    }
}

/// Prefix a single `/` unless one is already present.
pub fn with_leading_slash(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint)
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// A tagged comment marking where an HTTP route is implemented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDeclaration {
    pub method: String,
    pub endpoint: String,
    pub file: PathBuf,
    pub locator: SourceLocator,
}

/// A tagged comment marking where client code issues a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendCall {
    pub method: String,
    pub endpoint: String,
    pub file: PathBuf,
    pub locator: SourceLocator,
}

impl BackendDeclaration {
    pub fn new(key: RouteKey, file: PathBuf, line: u32) -> Self {
        Self {
            method: key.method,
            endpoint: key.endpoint,
            locator: SourceLocator::at_line(file.clone(), line),
            file,
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl FrontendCall {
    pub fn new(key: RouteKey, file: PathBuf, line: u32) -> Self {
        Self {
            method: key.method,
            endpoint: key.endpoint,
            locator: SourceLocator::at_line(file.clone(), line),
            file,
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    /// Label shown for a call item: `METHOD endpoint`.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.endpoint)
    }
}

// ============================================================================
// HTTP verb ordering
// ============================================================================

/// Verbs with a fixed display priority; anything else sorts after them.
pub const VERB_ORDER: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Rank of a verb in [`VERB_ORDER`], or `VERB_ORDER.len()` for unknown verbs.
pub fn verb_rank(method: &str) -> usize {
    VERB_ORDER
        .iter()
        .position(|v| *v == method)
        .unwrap_or(VERB_ORDER.len())
}

/// `GET < POST < PUT < PATCH < DELETE < others (lexicographic)`.
pub fn compare_verbs(a: &str, b: &str) -> Ordering {
    verb_rank(a).cmp(&verb_rank(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_key_normalizes_method_and_slash() {
        let key = RouteKey::new("post", "users");
        assert_eq!(key.method, "POST");
        assert_eq!(key.endpoint, "/users");
        assert_eq!(key.to_string(), "POST /users");
    }

    #[test]
    fn test_route_key_keeps_params_and_trailing_slash() {
        assert_ne!(RouteKey::new("GET", "/users/:id"), RouteKey::new("GET", "/users/42"));
        assert_ne!(RouteKey::new("GET", "/users/"), RouteKey::new("GET", "/users"));
    }

    #[test]
    fn test_verb_ordering() {
        let mut verbs = vec!["OPTIONS", "DELETE", "GET", "HEAD", "PATCH", "POST", "PUT"];
        verbs.sort_by(|a, b| compare_verbs(a, b));
        assert_eq!(
            verbs,
            vec!["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
        );
    }
}
