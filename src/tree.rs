//! Route tree builder.
//!
//! Turns the flat backend list into a hierarchy keyed by URL path segments,
//! with each route's matching frontend calls hanging off its method leaf.
//! The tree is rebuilt wholesale from a scan snapshot; it is never patched.

use crate::types::{BackendDeclaration, FrontendCall, RouteKey, SourceLocator, compare_verbs};
use crate::xref::CrossReferenceIndex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Label of the synthetic segment holding routes declared on `/`.
pub const ROOT_SEGMENT: &str = "/";

/// One `/`-delimited path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNode {
    pub label: String,
    /// Path up to and including this segment, e.g. `/users/:id`.
    pub path: String,
    pub segments: BTreeMap<String, SegmentNode>,
    pub methods: Vec<MethodLeaf>,
}

/// One `(method, endpoint)` route at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLeaf {
    pub method: String,
    pub endpoint: String,
    pub declaration: BackendDeclaration,
    /// Every frontend call with exactly this key, in scan order.
    pub calls: Vec<FrontendCall>,
}

impl SegmentNode {
    fn new(label: &str, path: String) -> Self {
        Self {
            label: label.to_string(),
            path,
            segments: BTreeMap::new(),
            methods: Vec::new(),
        }
    }

    fn child(&mut self, label: &str) -> &mut SegmentNode {
        let path = if self.path == ROOT_SEGMENT {
            format!("/{}", label)
        } else {
            format!("{}/{}", self.path, label)
        };
        self.segments
            .entry(label.to_string())
            .or_insert_with(|| SegmentNode::new(label, path))
    }

    fn sort(&mut self) {
        self.methods.sort_by(|a, b| {
            compare_verbs(&a.method, &b.method).then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        for child in self.segments.values_mut() {
            child.sort();
        }
    }

    /// Method leaves in verb order, then child segments by label.
    pub fn children(&self) -> Vec<RouteNode<'_>> {
        self.methods
            .iter()
            .map(RouteNode::Method)
            .chain(self.segments.values().map(RouteNode::Segment))
            .collect()
    }

    pub fn segment(&self, label: &str) -> Option<&SegmentNode> {
        self.segments.get(label)
    }
}

impl MethodLeaf {
    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// A node as the tree view sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteNode<'a> {
    Segment(&'a SegmentNode),
    Method(&'a MethodLeaf),
    Call(&'a FrontendCall),
}

impl<'a> RouteNode<'a> {
    pub fn label(&self) -> String {
        match self {
            Self::Segment(segment) => segment.label.clone(),
            Self::Method(leaf) => leaf.method.clone(),
            Self::Call(call) => call.label(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Segment(segment) => segment.path.clone(),
            Self::Method(leaf) => leaf.endpoint.clone(),
            Self::Call(call) => describe_location(&call.locator),
        }
    }

    /// Segments always expand; a method leaf only when something calls it.
    pub fn is_expandable(&self) -> bool {
        match self {
            Self::Segment(_) => true,
            Self::Method(leaf) => !leaf.calls.is_empty(),
            Self::Call(_) => false,
        }
    }

    pub fn children(&self) -> Vec<RouteNode<'a>> {
        match self {
            Self::Segment(segment) => segment.children(),
            Self::Method(leaf) => leaf.calls.iter().map(RouteNode::Call).collect(),
            Self::Call(_) => Vec::new(),
        }
    }

    /// Where activating the node navigates to.
    pub fn locator(&self) -> Option<&'a SourceLocator> {
        match self {
            Self::Segment(_) => None,
            Self::Method(leaf) => Some(&leaf.declaration.locator),
            Self::Call(call) => Some(&call.locator),
        }
    }

    pub fn to_outline(&self) -> OutlineItem {
        OutlineItem {
            kind: match self {
                Self::Segment(_) => OutlineKind::Segment,
                Self::Method(_) => OutlineKind::Method,
                Self::Call(_) => OutlineKind::Call,
            },
            label: self.label(),
            description: self.description(),
            expandable: self.is_expandable(),
            locator: self.locator().cloned(),
            children: self.children().iter().map(|c| c.to_outline()).collect(),
        }
    }
}

fn describe_location(locator: &SourceLocator) -> String {
    let name = locator
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| locator.path.display().to_string());
    match locator.line {
        Some(line) => format!("{}:{}", name, line + 1),
        None => name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineKind {
    Segment,
    Method,
    Call,
}

/// Owned, serializable rendering of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineItem {
    pub kind: OutlineKind,
    pub label: String,
    pub description: String,
    pub expandable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<SourceLocator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

/// The whole route hierarchy for one scan generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTree {
    roots: BTreeMap<String, SegmentNode>,
}

impl RouteTree {
    /// Build from scratch. Pure: the same inputs always give the same tree.
    ///
    /// Duplicate declarations of a key yield a single leaf whose declaration
    /// is the one the index resolves to.
    pub fn build(
        backend: &[BackendDeclaration],
        frontend: &[FrontendCall],
        index: &CrossReferenceIndex,
    ) -> Self {
        let mut calls_by_key: HashMap<RouteKey, Vec<&FrontendCall>> = HashMap::new();
        for call in frontend {
            calls_by_key.entry(call.key()).or_default().push(call);
        }

        let mut tree = Self::default();
        let mut seen: HashSet<RouteKey> = HashSet::new();

        for decl in backend {
            let key = decl.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            let declaration = index.lookup_key(&key).declaration().unwrap_or(decl).clone();
            let calls = calls_by_key
                .get(&key)
                .map(|calls| calls.iter().map(|c| (*c).clone()).collect())
                .unwrap_or_default();

            let normalized = normalize_endpoint(&decl.endpoint);
            let segments = path_segments(&normalized);
            tree.segment_for(&segments).methods.push(MethodLeaf {
                method: key.method,
                endpoint: key.endpoint,
                declaration,
                calls,
            });
        }

        for root in tree.roots.values_mut() {
            root.sort();
        }
        tree
    }

    fn segment_for(&mut self, segments: &[&str]) -> &mut SegmentNode {
        let Some((first, rest)) = segments.split_first() else {
            return self
                .roots
                .entry(ROOT_SEGMENT.to_string())
                .or_insert_with(|| SegmentNode::new(ROOT_SEGMENT, ROOT_SEGMENT.to_string()));
        };
        let mut node = self
            .roots
            .entry(first.to_string())
            .or_insert_with(|| SegmentNode::new(first, format!("/{}", first)));
        for segment in rest {
            node = node.child(segment);
        }
        node
    }

    /// Top-level segments sorted by label.
    pub fn roots(&self) -> Vec<RouteNode<'_>> {
        self.roots.values().map(RouteNode::Segment).collect()
    }

    pub fn root(&self, label: &str) -> Option<&SegmentNode> {
        self.roots.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every method leaf, depth-first in display order.
    pub fn leaves(&self) -> Vec<&MethodLeaf> {
        fn walk<'a>(segment: &'a SegmentNode, out: &mut Vec<&'a MethodLeaf>) {
            out.extend(segment.methods.iter());
            for child in segment.segments.values() {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in self.roots.values() {
            walk(root, &mut out);
        }
        out
    }

    pub fn outline(&self) -> Vec<OutlineItem> {
        self.roots().iter().map(|r| r.to_outline()).collect()
    }
}

/// Strip query string and fragment, trim, and ensure one leading `/`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let path = endpoint
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    format!("/{}", path.trim_start_matches('/'))
}

/// Non-empty `/`-separated segments.
pub fn path_segments(endpoint: &str) -> Vec<&str> {
    endpoint.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn decl(method: &str, endpoint: &str) -> BackendDeclaration {
        BackendDeclaration::new(RouteKey::new(method, endpoint), PathBuf::from("/ws/api.ts"), 0)
    }

    fn call(method: &str, endpoint: &str, line: u32) -> FrontendCall {
        FrontendCall::new(RouteKey::new(method, endpoint), PathBuf::from("/ws/web.ts"), line)
    }

    fn build(backend: &[BackendDeclaration], frontend: &[FrontendCall]) -> RouteTree {
        RouteTree::build(backend, frontend, &CrossReferenceIndex::build(backend))
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/users?page=2"), "/users");
        assert_eq!(normalize_endpoint(" users#top "), "/users");
        assert_eq!(normalize_endpoint("//users"), "/users");
        assert_eq!(normalize_endpoint("?x=1"), "/");
        assert_eq!(path_segments("/a//b/"), vec!["a", "b"]);
        assert!(path_segments("/").is_empty());
    }

    #[test]
    fn test_root_endpoint_uses_synthetic_segment() {
        let tree = build(&[decl("GET", "/")], &[]);
        let root = tree.root(ROOT_SEGMENT).unwrap();
        assert_eq!(root.methods.len(), 1);
        assert_eq!(root.path, "/");
        assert_eq!(tree.roots().len(), 1);
    }

    #[test]
    fn test_segment_paths() {
        let tree = build(&[decl("GET", "/a/b/c")], &[]);
        let c = tree
            .root("a")
            .and_then(|a| a.segment("b"))
            .and_then(|b| b.segment("c"))
            .unwrap();
        assert_eq!(c.path, "/a/b/c");
        assert_eq!(c.methods[0].endpoint, "/a/b/c");
    }

    #[test]
    fn test_methods_precede_segments() {
        let tree = build(&[decl("GET", "/a/b"), decl("GET", "/a")], &[]);
        let a = RouteNode::Segment(tree.root("a").unwrap());
        let labels: Vec<_> = a.children().iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["GET", "b"]);
    }

    #[test]
    fn test_unknown_verbs_sort_last() {
        let tree = build(
            &[
                decl("OPTIONS", "/x"),
                decl("DELETE", "/x"),
                decl("HEAD", "/x"),
                decl("GET", "/x"),
            ],
            &[],
        );
        let methods: Vec<_> = tree.root("x").unwrap().methods.iter().map(|m| m.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "DELETE", "HEAD", "OPTIONS"]);
    }

    #[test]
    fn test_query_variants_share_segment() {
        let tree = build(&[decl("GET", "/s?b=1"), decl("GET", "/s?a=1")], &[]);
        let s = tree.root("s").unwrap();
        let endpoints: Vec<_> = s.methods.iter().map(|m| m.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["/s?a=1", "/s?b=1"]);
    }

    #[test]
    fn test_leaf_expandability_and_call_children() {
        let tree = build(
            &[decl("GET", "/users"), decl("POST", "/users")],
            &[call("GET", "/users", 3), call("GET", "/users", 9)],
        );
        let users = tree.root("users").unwrap();
        let get = RouteNode::Method(&users.methods[0]);
        let post = RouteNode::Method(&users.methods[1]);
        assert!(get.is_expandable());
        assert!(!post.is_expandable());

        let children = get.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].label(), "GET /users");
        assert_eq!(children[0].description(), "web.ts:4");
        assert_eq!(children[1].locator().unwrap().line, Some(9));
    }

    #[test]
    fn test_duplicate_declarations_single_leaf() {
        let mut second = decl("GET", "/dup");
        second.file = PathBuf::from("/ws/other.ts");
        second.locator.path = second.file.clone();
        let tree = build(&[decl("GET", "/dup"), second], &[]);
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].declaration.file, PathBuf::from("/ws/api.ts"));
    }

    #[test]
    fn test_outline() {
        let tree = build(&[decl("GET", "/a")], &[call("GET", "/a", 0)]);
        let outline = tree.outline();
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].kind, OutlineKind::Segment);
        assert_eq!(outline[0].children[0].kind, OutlineKind::Method);
        assert_eq!(outline[0].children[0].children[0].kind, OutlineKind::Call);
        assert!(outline[0].children[0].expandable);
    }
}
