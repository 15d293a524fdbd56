//! Link projection for a single open document.
//!
//! Turns every frontend tag in a document into a linkable span whose target
//! is the encoded locator of the matching backend declaration, or the
//! unresolved sentinel. Projection is pure; any per-document caching lives in
//! a [`DecorationCache`] owned by the host.

use crate::locator::LocatorCodec;
use crate::tags::{LineCounter, TagParser};
use crate::xref::{CrossReferenceIndex, Resolution, UNRESOLVED_TARGET};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a span points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Encoded locator of the backend declaration.
    Resolved(String),
    Unresolved,
}

impl LinkTarget {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolved(target) => target,
            Self::Unresolved => UNRESOLVED_TARGET,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl Serialize for LinkTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A frontend tag rendered as a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSpan {
    /// Byte offset of the tag's `//`.
    pub start: usize,
    /// Byte offset past the tag, trailing whitespace excluded.
    pub end: usize,
    /// 0-based line of `start`.
    pub line: u32,
    pub method: String,
    pub endpoint: String,
    pub target: LinkTarget,
}

/// Project every frontend tag in `text`.
pub fn project_decorations(
    text: &str,
    index: &CrossReferenceIndex,
    codec: &LocatorCodec,
) -> Vec<LinkSpan> {
    let mut lines = LineCounter::new(text);
    TagParser::frontend()
        .matches(text)
        .map(|m| {
            let target = match index.lookup_key(&m.key()) {
                Resolution::Resolved(decl) => LinkTarget::Resolved(codec.encode(&decl.locator)),
                Resolution::Unresolved => LinkTarget::Unresolved,
            };
            LinkSpan {
                start: m.start,
                end: m.end,
                line: lines.line_at(m.start),
                method: m.method,
                endpoint: m.endpoint,
                target,
            }
        })
        .collect()
}

/// Per-document spans, owned by whoever renders them.
///
/// `refresh` always discards a document's previous spans before storing the
/// new ones, so repeated edits never accumulate stale entries.
#[derive(Debug, Default)]
pub struct DecorationCache {
    documents: HashMap<PathBuf, Vec<LinkSpan>>,
}

impl DecorationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(
        &mut self,
        document: &Path,
        text: &str,
        index: &CrossReferenceIndex,
        codec: &LocatorCodec,
    ) -> &[LinkSpan] {
        let spans = project_decorations(text, index, codec);
        let entry = self.documents.entry(document.to_path_buf()).or_default();
        *entry = spans;
        entry
    }

    pub fn get(&self, document: &Path) -> Option<&[LinkSpan]> {
        self.documents.get(document).map(|s| s.as_slice())
    }

    /// Drop one document's spans (closed or switched away from).
    pub fn reset(&mut self, document: &Path) {
        self.documents.remove(document);
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendDeclaration, RouteKey};

    fn index() -> CrossReferenceIndex {
        CrossReferenceIndex::build(&[BackendDeclaration::new(
            RouteKey::new("GET", "/users"),
            PathBuf::from("/ws/server/users.ts"),
            4,
        )])
    }

    const DOC: &str = concat!(
        "// ENDPOINTER <frontend> method: \"GET\", endpoint: \"/users\"\n",
        "fetch('/users');\n",
        "// ENDPOINTER <frontend> method: \"DELETE\", endpoint: \"/users\"  \n",
    );

    #[test]
    fn test_resolved_and_unresolved_spans() {
        let spans = project_decorations(DOC, &index(), &LocatorCodec::default());
        assert_eq!(spans.len(), 2);

        assert_eq!(spans[0].line, 0);
        assert_eq!(
            spans[0].target,
            LinkTarget::Resolved("vscode://file/ws/server/users.ts:4".to_string())
        );

        assert_eq!(spans[1].line, 2);
        assert_eq!(spans[1].target, LinkTarget::Unresolved);
        assert_eq!(spans[1].target.as_str(), UNRESOLVED_TARGET);
        assert!(DOC[spans[1].start..spans[1].end].ends_with('"'));
    }

    #[test]
    fn test_target_serializes_as_string() {
        let spans = project_decorations(DOC, &index(), &LocatorCodec::default());
        let json = serde_json::to_value(&spans[1]).unwrap();
        assert_eq!(json["target"], UNRESOLVED_TARGET);
    }

    #[test]
    fn test_cache_replaces_previous_spans() {
        let mut cache = DecorationCache::new();
        let doc = Path::new("/ws/web/app.ts");
        let codec = LocatorCodec::default();

        assert_eq!(cache.refresh(doc, DOC, &index(), &codec).len(), 2);
        assert_eq!(cache.refresh(doc, DOC, &index(), &codec).len(), 2);
        assert_eq!(cache.refresh(doc, "edited away", &index(), &codec).len(), 0);
        assert_eq!(cache.len(), 1);

        cache.reset(doc);
        assert!(cache.get(doc).is_none());
        assert!(cache.is_empty());
    }
}
