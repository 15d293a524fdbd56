//! Debounced filesystem watcher that drives rescans.
//!
//! Watches every workspace folder recursively and forwards batches of
//! relevant changes to an async channel. The consumer awaits each rescan
//! before pulling the next batch, so scans never overlap.

use crate::config::{CONFIG_DIR, CONFIG_FILE};
use crate::discovery::default_excludes;
use anyhow::{Context, Result};
use globset::GlobSet;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Events sent from the watcher to the rescan loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Source files changed.
    FilesChanged(Vec<PathBuf>),
    /// A workspace config file changed; reload it before rescanning.
    ConfigChanged,
}

pub struct RescanWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
}

impl RescanWatcher {
    pub fn new(folders: &[PathBuf], debounce: Duration) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let filter = ChangeFilter::new(folders.to_vec())?;

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(batch) => {
                    let paths: Vec<PathBuf> = batch.into_iter().map(|e| e.path).collect();
                    for event in filter.classify(paths) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("Watch error: {:?}", e),
            }
        })
        .context("Failed to create file watcher")?;

        for folder in folders {
            debouncer
                .watcher()
                .watch(folder, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", folder.display()))?;
            tracing::info!("Watching {}", folder.display());
        }

        Ok(Self {
            _debouncer: debouncer,
            events,
        })
    }

    /// Next change batch; `None` once the watcher has shut down.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

/// Splits raw change paths into config changes and relevant source changes.
pub struct ChangeFilter {
    roots: Vec<PathBuf>,
    excludes: GlobSet,
}

impl ChangeFilter {
    pub fn new(roots: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            roots,
            excludes: default_excludes()?,
        })
    }

    pub fn classify(&self, paths: Vec<PathBuf>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        if paths.iter().any(|p| self.is_config(p)) {
            events.push(WatchEvent::ConfigChanged);
        }
        let changed: Vec<PathBuf> = paths.into_iter().filter(|p| self.is_relevant(p)).collect();
        if !changed.is_empty() {
            events.push(WatchEvent::FilesChanged(changed));
        }
        events
    }

    fn is_config(&self, path: &Path) -> bool {
        self.roots
            .iter()
            .any(|root| path == root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    fn is_relevant(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| match path.strip_prefix(root) {
            Ok(rel) => !self.excludes.is_match(rel),
            Err(_) => false,
        })
    }
}
