//! Cross-reference index from `(method, endpoint)` to backend declarations.
//!
//! Matching is purely lexical: the uppercased method plus the endpoint string
//! as captured. There is no trailing-slash folding and no path-parameter
//! matching, so `/users/:id` never resolves a call to `/users/42`.

use crate::types::{BackendDeclaration, FrontendCall, RouteKey};
use std::collections::HashMap;

/// Text shown in place of a target when a call has no matching declaration.
pub const UNRESOLVED_TARGET: &str = "Cannot find matching backend endpoint";

/// Outcome of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a BackendDeclaration),
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn declaration(&self) -> Option<&'a BackendDeclaration> {
        match self {
            Self::Resolved(decl) => Some(decl),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// First-wins lookup over one scan generation's backend declarations.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    by_key: HashMap<RouteKey, BackendDeclaration>,
    duplicates: Vec<BackendDeclaration>,
}

impl CrossReferenceIndex {
    /// Build from declarations in scan order. Later duplicates of a key are
    /// kept aside for reporting but never win a lookup.
    pub fn build(backend: &[BackendDeclaration]) -> Self {
        let mut index = Self::default();
        for decl in backend {
            let key = decl.key();
            if index.by_key.contains_key(&key) {
                index.duplicates.push(decl.clone());
            } else {
                index.by_key.insert(key, decl.clone());
            }
        }
        index
    }

    pub fn lookup(&self, method: &str, endpoint: &str) -> Resolution<'_> {
        self.lookup_key(&RouteKey::new(method, endpoint))
    }

    pub fn lookup_key(&self, key: &RouteKey) -> Resolution<'_> {
        match self.by_key.get(key) {
            Some(decl) => Resolution::Resolved(decl),
            None => Resolution::Unresolved,
        }
    }

    pub fn resolve_call(&self, call: &FrontendCall) -> Resolution<'_> {
        self.lookup_key(&call.key())
    }

    /// Declarations shadowed by an earlier one with the same key.
    pub fn duplicates(&self) -> &[BackendDeclaration] {
        &self.duplicates
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn decl(method: &str, endpoint: &str, file: &str, line: u32) -> BackendDeclaration {
        BackendDeclaration::new(RouteKey::new(method, endpoint), PathBuf::from(file), line)
    }

    #[test]
    fn test_first_declaration_wins() {
        let backend = vec![
            decl("GET", "/users", "/ws/a.ts", 1),
            decl("GET", "/users", "/ws/b.ts", 7),
            decl("POST", "/users", "/ws/a.ts", 9),
        ];
        let index = CrossReferenceIndex::build(&backend);

        assert_eq!(index.len(), 2);
        let found = index.lookup("get", "/users").declaration().unwrap();
        assert_eq!(found.file, PathBuf::from("/ws/a.ts"));
        assert_eq!(index.duplicates().len(), 1);
        assert_eq!(index.duplicates()[0].file, PathBuf::from("/ws/b.ts"));
    }

    #[test]
    fn test_unresolved_is_explicit() {
        let index = CrossReferenceIndex::build(&[decl("GET", "/users/:id", "/ws/a.ts", 0)]);
        assert_eq!(index.lookup("GET", "/users/42"), Resolution::Unresolved);
        assert_eq!(index.lookup("GET", "/users/:id/"), Resolution::Unresolved);
        assert!(index.lookup("GET", "/users/:id").is_resolved());

        let empty = CrossReferenceIndex::default();
        assert!(empty.is_empty());
        assert_eq!(empty.lookup("GET", "/"), Resolution::Unresolved);
    }

    #[test]
    fn test_endpoint_is_case_sensitive() {
        let index = CrossReferenceIndex::build(&[decl("GET", "/Users", "/ws/a.ts", 0)]);
        assert_eq!(index.lookup("GET", "/users"), Resolution::Unresolved);
    }
}
