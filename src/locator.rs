//! Locator string codec.
//!
//! Encoded form: `<scheme>://file<absolutePath>[:<line>]`. Decoding also
//! accepts a bare `<path>:<line>` or `<path>`, and copes with Windows drive
//! letters: only the last colon can separate a line, and only when what
//! follows it is an integer.

use crate::error::DecodeError;
use crate::types::SourceLocator;
use std::path::PathBuf;

pub const DEFAULT_SCHEME: &str = "vscode";

/// Encodes and decodes [`SourceLocator`]s for a host-chosen URL scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorCodec {
    scheme: String,
}

impl Default for LocatorCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

impl LocatorCodec {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn encode(&self, locator: &SourceLocator) -> String {
        let path = locator.path.to_string_lossy();
        // URI paths are rooted; `C:\x` travels as `/C:\x`.
        let slash = if starts_with_drive(&path) { "/" } else { "" };
        match locator.line {
            Some(line) => format!("{}://file{}{}:{}", self.scheme, slash, path, line),
            None => format!("{}://file{}{}", self.scheme, slash, path),
        }
    }

    /// Decode any accepted form. The scheme need not match this codec's.
    pub fn decode(&self, input: &str) -> Result<SourceLocator, DecodeError> {
        decode(input)
    }
}

/// Decode a locator string regardless of scheme.
pub fn decode(input: &str) -> Result<SourceLocator, DecodeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let rest = strip_scheme(trimmed);
    let (path, line) = split_line(rest);
    let path = strip_drive_slash(path);

    if path.is_empty() {
        return Err(DecodeError::MissingPath(input.to_string()));
    }

    Ok(SourceLocator {
        path: PathBuf::from(path),
        line,
    })
}

/// `vscode://file/x` -> `/x`; `file:///x` -> `/x`; anything else unchanged.
fn strip_scheme(input: &str) -> &str {
    let Some(idx) = input.find("://") else {
        return input;
    };
    let scheme = &input[..idx];
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return input;
    }
    let rest = &input[idx + 3..];
    rest.strip_prefix("file").unwrap_or(rest)
}

fn split_line(input: &str) -> (&str, Option<u32>) {
    if let Some(idx) = input.rfind(':') {
        let suffix = &input[idx + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(line) = suffix.parse::<u32>() {
                return (&input[..idx], Some(line));
            }
        }
    }
    (input, None)
}

fn strip_drive_slash(path: &str) -> &str {
    match path.strip_prefix('/') {
        Some(rest) if starts_with_drive(rest) => rest,
        _ => path,
    }
}

fn starts_with_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl std::str::FromStr for SourceLocator {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
