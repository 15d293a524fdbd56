//! Workspace scanning engine.
//!
//! Selects files per side, reads each one once without blocking the runtime,
//! and extracts backend declarations and frontend calls in source order.

use crate::config::EndpointerConfig;
use crate::discovery::FileDiscovery;
use crate::error::ScanError;
use crate::tags::{LineCounter, TagParser};
use crate::types::{BackendDeclaration, FrontendCall};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default number of files read concurrently.
pub const DEFAULT_READ_CONCURRENCY: usize = 32;

/// Which tag kinds to extract from a selected file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sides {
    backend: bool,
    frontend: bool,
}

/// Tags extracted from one file.
#[derive(Debug, Default)]
pub struct FileTags {
    pub backend: Vec<BackendDeclaration>,
    pub frontend: Vec<FrontendCall>,
}

/// Result of one full scan pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub backend: Vec<BackendDeclaration>,
    pub frontend: Vec<FrontendCall>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

/// Scans workspace folders for tagged comments.
pub struct WorkspaceScanner {
    extra_excludes: Vec<String>,
    concurrency: usize,
}

impl WorkspaceScanner {
    pub fn new() -> Self {
        Self {
            extra_excludes: Vec::new(),
            concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    /// Exclude an additional glob on top of the default set.
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.extra_excludes.push(pattern.to_string());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Perform a full scan of the given folders.
    ///
    /// No folders means an empty result, not an error. Unreadable files are
    /// logged and skipped.
    pub async fn scan(&self, folders: &[PathBuf], config: &EndpointerConfig) -> Result<ScanOutcome> {
        if folders.is_empty() {
            tracing::info!("No workspace folders to scan");
            return Ok(ScanOutcome::default());
        }

        let selected = self.select_files(folders, config)?;
        tracing::info!(
            "Scanning {} files across {} folders",
            selected.len(),
            folders.len()
        );

        let mut outcome = ScanOutcome::default();
        let mut reads = stream::iter(selected)
            .map(|(path, sides)| async move {
                let result = scan_file(&path, sides).await;
                (path, result)
            })
            .buffered(self.concurrency);

        while let Some((path, result)) = reads.next().await {
            match result {
                Ok(tags) => {
                    outcome.files_scanned += 1;
                    if !tags.backend.is_empty() || !tags.frontend.is_empty() {
                        tracing::debug!(
                            "{}: {} backend, {} frontend",
                            path.display(),
                            tags.backend.len(),
                            tags.frontend.len()
                        );
                    }
                    outcome.backend.extend(tags.backend);
                    outcome.frontend.extend(tags.frontend);
                }
                Err(e) => {
                    outcome.files_skipped += 1;
                    tracing::warn!("Skipping file: {}", e);
                }
            }
        }

        tracing::info!(
            "Scan complete: {} endpoints, {} frontend calls ({} files, {} skipped)",
            outcome.backend.len(),
            outcome.frontend.len(),
            outcome.files_scanned,
            outcome.files_skipped
        );

        Ok(outcome)
    }

    /// Union of both sides' selections, deduplicated by absolute path and
    /// ordered by path so repeated scans list matches identically.
    fn select_files(
        &self,
        folders: &[PathBuf],
        config: &EndpointerConfig,
    ) -> Result<BTreeMap<PathBuf, Sides>> {
        let mut selected: BTreeMap<PathBuf, Sides> = BTreeMap::new();

        for folder in folders {
            let root = resolve_folder(folder);
            let backend = self.discovery(FileDiscovery::for_side(&config.backend));
            for file in backend.discover(&root)? {
                selected.entry(file).or_default().backend = true;
            }
            let frontend = self.discovery(FileDiscovery::for_side(&config.frontend));
            for file in frontend.discover(&root)? {
                selected.entry(file).or_default().frontend = true;
            }
        }

        Ok(selected)
    }

    fn discovery(&self, discovery: FileDiscovery) -> FileDiscovery {
        self.extra_excludes
            .iter()
            .fold(discovery, |d, pattern| d.with_exclude(pattern))
    }
}

impl Default for WorkspaceScanner {
    fn default() -> Self {
        Self::new()
    }
}

async fn scan_file(path: &Path, sides: Sides) -> Result<FileTags, ScanError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScanError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(extract_tags(path, &text, sides.backend, sides.frontend))
}

/// Extract both tag kinds from already-loaded text.
pub fn extract_tags(path: &Path, text: &str, backend: bool, frontend: bool) -> FileTags {
    let mut tags = FileTags::default();

    if backend {
        let mut lines = LineCounter::new(text);
        tags.backend = TagParser::backend()
            .matches(text)
            .map(|m| BackendDeclaration::new(m.key(), path.to_path_buf(), lines.line_at(m.start)))
            .collect();
    }

    if frontend {
        let mut lines = LineCounter::new(text);
        tags.frontend = TagParser::frontend()
            .matches(text)
            .map(|m| FrontendCall::new(m.key(), path.to_path_buf(), lines.line_at(m.start)))
            .collect();
    }

    tags
}

/// Canonical form of a workspace folder, falling back to an absolute path.
pub fn resolve_folder(folder: &Path) -> PathBuf {
    folder
        .canonicalize()
        .unwrap_or_else(|_| std::path::absolute(folder).unwrap_or_else(|_| folder.to_path_buf()))
}
