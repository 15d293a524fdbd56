//! Comment-tag grammar.
//!
//! Recognizes the two Endpointer line-comment tags inside arbitrary text:
//!
//! ```text
//! // ENDPOINTER <backend> method: "POST", endpoint: "/users"
//! // ENDPOINTER <frontend> method: "GET", endpoint: "/users/:id"
//! ```
//!
//! Extraction is best-effort: anything that does not fit the grammar exactly
//! (missing quotes, unknown tag name, multi-line values) is not a match, and
//! nothing here ever fails.

use crate::types::RouteKey;
use regex::{CaptureMatches, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Literal marker every tag comment carries.
pub const MARKER: &str = "ENDPOINTER";

static BACKEND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&tag_pattern("backend")).expect("backend tag pattern"));

static FRONTEND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&tag_pattern("frontend")).expect("frontend tag pattern"));

/// Groups: 1=method, 2=endpoint. Whitespace is horizontal only, so a tag
/// never spans lines.
fn tag_pattern(tag: &str) -> String {
    format!(
        r#"//[ \t]*{MARKER}[ \t]*<{tag}>[ \t]*method:[ \t]*"([^"\r\n]*)",[ \t]*endpoint:[ \t]*"([^"\r\n]*)"[ \t]*"#
    )
}

/// Which side of the cross-reference a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Backend,
    Frontend,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }

    /// The `<backend>` / `<frontend>` tag literal.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Backend => "<backend>",
            Self::Frontend => "<frontend>",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Self::Backend => &*BACKEND_PATTERN,
            Self::Frontend => &*FRONTEND_PATTERN,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TagKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "frontend" => Ok(Self::Frontend),
            _ => Err(format!("Unknown tag kind: {}", s)),
        }
    }
}

/// One tag found in a block of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub kind: TagKind,
    /// Uppercased verb.
    pub method: String,
    /// Endpoint with a guaranteed leading `/`.
    pub endpoint: String,
    /// Byte offset of the `//` opening the comment.
    pub start: usize,
    /// Byte offset just past the tag, trailing whitespace excluded.
    pub end: usize,
}

impl TagMatch {
    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Extractor for one tag kind.
///
/// Holds no cursor: every call to [`TagParser::matches`] starts from the
/// beginning of the text it is given, so one parser can be shared across
/// documents and threads.
#[derive(Debug, Clone, Copy)]
pub struct TagParser {
    kind: TagKind,
}

impl TagParser {
    pub fn new(kind: TagKind) -> Self {
        Self { kind }
    }

    pub fn backend() -> Self {
        Self::new(TagKind::Backend)
    }

    pub fn frontend() -> Self {
        Self::new(TagKind::Frontend)
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Lazily iterate all tags of this kind in `text`, in source order.
    pub fn matches<'t>(&self, text: &'t str) -> TagMatches<'t> {
        TagMatches {
            kind: self.kind,
            inner: self.kind.pattern().captures_iter(text),
        }
    }
}

/// Iterator returned by [`TagParser::matches`].
pub struct TagMatches<'t> {
    kind: TagKind,
    inner: CaptureMatches<'static, 't>,
}

impl Iterator for TagMatches<'_> {
    type Item = TagMatch;

    fn next(&mut self) -> Option<TagMatch> {
        let caps = self.inner.next()?;
        let whole = caps.get(0)?;
        let key = RouteKey::new(caps.get(1)?.as_str(), caps.get(2)?.as_str());
        Some(TagMatch {
            kind: self.kind,
            method: key.method,
            endpoint: key.endpoint,
            start: whole.start(),
            end: whole.start() + whole.as_str().trim_end().len(),
        })
    }
}

/// Whether a single line mentions a tag of `kind`, well-formed or not.
pub fn line_has_tag(line: &str, kind: TagKind) -> bool {
    line.contains(MARKER) && line.contains(kind.tag())
}

/// Render a well-formed tag comment.
pub fn template(kind: TagKind, method: &str, endpoint: &str) -> String {
    format!(
        r#"// {MARKER} {} method: "{}", endpoint: "{}""#,
        kind.tag(),
        method.to_uppercase(),
        endpoint
    )
}

/// Converts byte offsets to 0-based line numbers.
///
/// Counting resumes from the previous query when offsets arrive in
/// ascending order, which is how tag matches are produced.
pub struct LineCounter<'t> {
    text: &'t str,
    offset: usize,
    line: usize,
}

impl<'t> LineCounter<'t> {
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            offset: 0,
            line: 0,
        }
    }

    pub fn line_at(&mut self, offset: usize) -> u32 {
        let offset = offset.min(self.text.len());
        if offset < self.offset {
            self.offset = 0;
            self.line = 0;
        }
        let bytes = &self.text.as_bytes()[self.offset..offset];
        self.line += bytecount::count(bytes, b'\n');
        self.offset = offset;
        self.line as u32
    }
}
