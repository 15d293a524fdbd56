//! Shared state for the Endpointer engine.
//!
//! `EndpointerState` holds the latest scan snapshot and exposes the calls a
//! host makes: rescan, read the route tree, list frontend calls, project
//! links for a document, and encode/decode locators.
//!
//! A snapshot is immutable once published. Rescans are serialized and swap
//! the whole snapshot at once, so readers see either the old lists or the
//! new ones, never a mix.

use crate::config::{EndpointerConfig, SideConfig};
use crate::decorations::{LinkSpan, project_decorations};
use crate::discovery::FileSelector;
use crate::error::DecodeError;
use crate::locator::LocatorCodec;
use crate::scanner::{WorkspaceScanner, resolve_folder};
use crate::tree::RouteTree;
use crate::types::{BackendDeclaration, FrontendCall, SourceLocator};
use crate::xref::CrossReferenceIndex;
use anyhow::Result;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// One scan generation's results.
#[derive(Debug, Default)]
pub struct ScanSnapshot {
    /// 0 until the first scan completes.
    pub generation: u64,
    pub folders: Vec<PathBuf>,
    pub backend: Vec<BackendDeclaration>,
    pub frontend: Vec<FrontendCall>,
    pub index: CrossReferenceIndex,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

/// The engine's only session state: the latest snapshot and a tree cache.
pub struct EndpointerState {
    snapshot: RwLock<Arc<ScanSnapshot>>,
    tree: RwLock<Option<Arc<RouteTree>>>,
    scan_lock: tokio::sync::Mutex<()>,
    scanner: WorkspaceScanner,
    codec: LocatorCodec,
    last_scanned: RwLock<Option<Instant>>,
}

impl EndpointerState {
    pub fn new(codec: LocatorCodec) -> Self {
        Self::with_scanner(WorkspaceScanner::new(), codec)
    }

    pub fn with_scanner(scanner: WorkspaceScanner, codec: LocatorCodec) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ScanSnapshot::default())),
            tree: RwLock::new(None),
            scan_lock: tokio::sync::Mutex::new(()),
            scanner,
            codec,
            last_scanned: RwLock::new(None),
        }
    }

    /// Scan `folders` and replace the stored snapshot.
    ///
    /// Concurrent calls queue behind each other.
    pub async fn rescan(
        &self,
        folders: &[PathBuf],
        config: &EndpointerConfig,
    ) -> Result<Arc<ScanSnapshot>> {
        let _guard = self.scan_lock.lock().await;
        let started = Instant::now();

        let outcome = self.scanner.scan(folders, config).await?;
        let index = CrossReferenceIndex::build(&outcome.backend);
        if !index.duplicates().is_empty() {
            tracing::debug!(
                "{} duplicate backend declarations ignored for lookup",
                index.duplicates().len()
            );
        }

        let generation = self.snapshot.read().generation + 1;
        let snapshot = Arc::new(ScanSnapshot {
            generation,
            folders: folders.iter().map(|f| resolve_folder(f)).collect(),
            backend: outcome.backend,
            frontend: outcome.frontend,
            index,
            files_scanned: outcome.files_scanned,
            files_skipped: outcome.files_skipped,
        });

        {
            let mut current = self.snapshot.write();
            let mut tree = self.tree.write();
            *current = snapshot.clone();
            *tree = None;
        }
        *self.last_scanned.write() = Some(Instant::now());

        tracing::info!(
            "Generation {} published in {:?}",
            generation,
            started.elapsed()
        );
        Ok(snapshot)
    }

    /// The current snapshot; empty before the first scan.
    pub fn snapshot(&self) -> Arc<ScanSnapshot> {
        self.snapshot.read().clone()
    }

    /// The route tree for the current snapshot, built on first access.
    pub fn route_tree(&self) -> Arc<RouteTree> {
        if let Some(tree) = self.tree.read().as_ref() {
            return tree.clone();
        }

        let snapshot = self.snapshot();
        let built = Arc::new(RouteTree::build(
            &snapshot.backend,
            &snapshot.frontend,
            &snapshot.index,
        ));

        // A rescan may have published while we were building.
        let current = self.snapshot.read();
        if Arc::ptr_eq(&snapshot, &*current) {
            *self.tree.write() = Some(built.clone());
        }
        built
    }

    /// All frontend calls, optionally restricted to one side's include rules.
    pub fn frontend_calls(&self, filter: Option<&SideConfig>) -> Result<Vec<FrontendCall>> {
        let snapshot = self.snapshot();
        let Some(side) = filter else {
            return Ok(snapshot.frontend.clone());
        };
        let selector = FileSelector::new(side)?;
        Ok(snapshot
            .frontend
            .iter()
            .filter(|call| selector.is_selected(&snapshot.folders, &call.file))
            .cloned()
            .collect())
    }

    /// Links for one document's current text against the current snapshot.
    pub fn project_decorations(&self, text: &str) -> Vec<LinkSpan> {
        project_decorations(text, &self.snapshot().index, &self.codec)
    }

    pub fn encode_locator(&self, locator: &SourceLocator) -> String {
        self.codec.encode(locator)
    }

    pub fn decode_locator(&self, input: &str) -> Result<SourceLocator, DecodeError> {
        self.codec.decode(input)
    }

    pub fn codec(&self) -> &LocatorCodec {
        &self.codec
    }

    pub fn stats(&self) -> ScanStats {
        let snapshot = self.snapshot();
        let unresolved = snapshot
            .frontend
            .iter()
            .filter(|call| !snapshot.index.resolve_call(call).is_resolved())
            .count();
        ScanStats {
            generation: snapshot.generation,
            endpoints: snapshot.backend.len(),
            distinct_routes: snapshot.index.len(),
            frontend_calls: snapshot.frontend.len(),
            unresolved_calls: unresolved,
            files_scanned: snapshot.files_scanned,
            files_skipped: snapshot.files_skipped,
            has_route_tree: self.tree.read().is_some(),
            last_scanned: *self.last_scanned.read(),
        }
    }
}

impl Default for EndpointerState {
    fn default() -> Self {
        Self::new(LocatorCodec::default())
    }
}

/// Statistics about the current snapshot.
#[derive(Debug, Clone)]
pub struct ScanStats {
    pub generation: u64,
    pub endpoints: usize,
    pub distinct_routes: usize,
    pub frontend_calls: usize,
    pub unresolved_calls: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub has_route_tree: bool,
    pub last_scanned: Option<Instant>,
}

/// Thread-safe shared state handle.
pub type SharedState = Arc<EndpointerState>;

/// Create a new shared state.
pub fn create_state(codec: LocatorCodec) -> SharedState {
    Arc::new(EndpointerState::new(codec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_workspace(temp: &TempDir) {
        std::fs::write(
            temp.path().join("server.ts"),
            "// ENDPOINTER <backend> method: \"GET\", endpoint: \"/users\"\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("client.ts"),
            concat!(
                "// ENDPOINTER <frontend> method: \"GET\", endpoint: \"/users\"\n",
                "// ENDPOINTER <frontend> method: \"POST\", endpoint: \"/users\"\n",
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_empty_before_first_scan() {
        let state = EndpointerState::default();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.backend.is_empty());
        assert!(state.route_tree().is_empty());
        assert!(state.frontend_calls(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rescan_publishes_and_invalidates_tree() {
        let temp = TempDir::new().unwrap();
        write_workspace(&temp);
        let state = EndpointerState::default();
        let folders = vec![temp.path().to_path_buf()];
        let config = EndpointerConfig::default();

        let first = state.rescan(&folders, &config).await.unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(first.backend.len(), 1);
        assert_eq!(first.frontend.len(), 2);

        let tree = state.route_tree();
        assert_eq!(tree.leaves()[0].calls.len(), 1);
        assert!(state.stats().has_route_tree);
        assert_eq!(state.stats().unresolved_calls, 1);

        std::fs::remove_file(temp.path().join("server.ts")).unwrap();
        let second = state.rescan(&folders, &config).await.unwrap();
        assert_eq!(second.generation, 2);
        assert!(!state.stats().has_route_tree);
        assert!(state.route_tree().is_empty());
        assert_eq!(first.backend.len(), 1);
    }

    #[tokio::test]
    async fn test_frontend_calls_filter() {
        let temp = TempDir::new().unwrap();
        write_workspace(&temp);
        let state = EndpointerState::default();
        state
            .rescan(&[temp.path().to_path_buf()], &EndpointerConfig::default())
            .await
            .unwrap();

        let only_tsx = SideConfig {
            include_folders: vec![],
            include_extensions: vec![".tsx".into()],
        };
        assert!(state.frontend_calls(Some(&only_tsx)).unwrap().is_empty());
        assert_eq!(state.frontend_calls(Some(&SideConfig::default())).unwrap().len(), 2);
    }
}
