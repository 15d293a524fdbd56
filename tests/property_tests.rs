//! Property-based tests for the tag parser, locator codec and route tree.
//!
//! Uses proptest to generate random inputs and verify invariants hold.

use endpointer::tags::{TagKind, template};
use endpointer::{
    BackendDeclaration, CrossReferenceIndex, FrontendCall, LocatorCodec, RouteKey, RouteTree,
    SourceLocator, TagParser,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Strategies for generating test data
// ============================================================================

fn path_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_.-]{0,11}"
}

fn unix_path() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec(path_segment(), 1..=6)
        .prop_map(|parts| PathBuf::from(format!("/{}", parts.join("/"))))
}

fn windows_path() -> impl Strategy<Value = PathBuf> {
    ("[A-Z]", prop::collection::vec(path_segment(), 1..=5))
        .prop_map(|(drive, parts)| PathBuf::from(format!("{}:\\{}", drive, parts.join("\\"))))
}

fn scheme() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9+.-]{0,9}"
}

fn verb() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("PATCH".to_string()),
        Just("DELETE".to_string()),
        Just("OPTIONS".to_string()),
        Just("get".to_string()),
    ]
}

fn endpoint() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}|:[a-z]{1,4}", 0..=4).prop_map(|parts| format!("/{}", parts.join("/")))
}

fn backend_list() -> impl Strategy<Value = Vec<BackendDeclaration>> {
    prop::collection::vec((verb(), endpoint(), 0u32..500), 0..30).prop_map(|items| {
        items
            .into_iter()
            .map(|(m, e, line)| {
                BackendDeclaration::new(RouteKey::new(&m, &e), PathBuf::from("/ws/server.ts"), line)
            })
            .collect()
    })
}

fn frontend_list() -> impl Strategy<Value = Vec<FrontendCall>> {
    prop::collection::vec((verb(), endpoint(), 0u32..500), 0..30).prop_map(|items| {
        items
            .into_iter()
            .map(|(m, e, line)| {
                FrontendCall::new(RouteKey::new(&m, &e), PathBuf::from("/ws/client.ts"), line)
            })
            .collect()
    })
}

// ============================================================================
// Locator codec
// ============================================================================

proptest! {
    #[test]
    fn locator_roundtrip_unix(path in unix_path(), line in proptest::option::of(0u32..100_000), scheme in scheme()) {
        let codec = LocatorCodec::new(scheme);
        let locator = SourceLocator::new(path, line);
        let decoded = codec.decode(&codec.encode(&locator)).unwrap();
        prop_assert_eq!(decoded, locator);
    }

    #[test]
    fn locator_roundtrip_windows(path in windows_path(), line in proptest::option::of(0u32..100_000)) {
        let codec = LocatorCodec::default();
        let locator = SourceLocator::new(path, line);
        let decoded = codec.decode(&codec.encode(&locator)).unwrap();
        prop_assert_eq!(decoded, locator);
    }

    #[test]
    fn decode_never_panics(input in ".{0,80}") {
        let _ = LocatorCodec::default().decode(&input);
    }
}

// ============================================================================
// Tag parser
// ============================================================================

proptest! {
    #[test]
    fn texts_without_marker_have_no_tags(text in ".{0,400}") {
        prop_assume!(!text.contains("ENDPOINTER"));
        prop_assert_eq!(TagParser::backend().matches(&text).count(), 0);
        prop_assert_eq!(TagParser::frontend().matches(&text).count(), 0);
    }

    #[test]
    fn templates_parse_back(method in "[A-Za-z]{1,7}", endpoint in endpoint(), prefix in "[a-z ;{}]{0,20}") {
        let text = format!("{}{}\n", prefix, template(TagKind::Frontend, &method, &endpoint));
        let matches: Vec<_> = TagParser::frontend().matches(&text).collect();
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(&matches[0].method, &method.to_uppercase());
        prop_assert_eq!(&matches[0].endpoint, &endpoint);
        prop_assert_eq!(matches[0].start, prefix.len());
        prop_assert_eq!(TagParser::backend().matches(&text).count(), 0);
    }
}

// ============================================================================
// Route tree
// ============================================================================

proptest! {
    #[test]
    fn tree_build_is_idempotent(backend in backend_list(), frontend in frontend_list()) {
        let index = CrossReferenceIndex::build(&backend);
        let first = RouteTree::build(&backend, &frontend, &index);
        let second = RouteTree::build(&backend, &frontend, &index);
        prop_assert_eq!(first.outline(), second.outline());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn one_leaf_per_distinct_key(backend in backend_list(), frontend in frontend_list()) {
        let index = CrossReferenceIndex::build(&backend);
        let tree = RouteTree::build(&backend, &frontend, &index);
        let leaves = tree.leaves();

        let keys: HashSet<RouteKey> = leaves.iter().map(|l| l.key()).collect();
        prop_assert_eq!(keys.len(), leaves.len());
        prop_assert_eq!(leaves.len(), index.len());

        for leaf in &leaves {
            prop_assert!(leaf.calls.iter().all(|c| c.key() == leaf.key()));
        }

        let attached: usize = leaves.iter().map(|l| l.calls.len()).sum();
        let resolvable = frontend
            .iter()
            .filter(|c| index.resolve_call(c).is_resolved())
            .count();
        prop_assert_eq!(attached, resolvable);
    }
}
