//! Coverage checks over a tagged workspace.
//!
//! Reports route handler files that lack a backend tag, API call sites with
//! no frontend tag just above them, frontend calls that resolve to nothing,
//! and backend keys declared more than once.

use crate::config::EndpointerConfig;
use crate::discovery::FileDiscovery;
use crate::state::ScanSnapshot;
use crate::tags::{TagKind, line_has_tag};
use crate::types::{BackendDeclaration, FrontendCall};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// How many lines above a call site a frontend tag may sit.
pub const DEFAULT_LOOKBACK: usize = 3;

/// An API call line with no frontend tag above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UntaggedCall {
    /// Path relative to the workspace root.
    pub file: String,
    /// 1-based.
    pub line: usize,
    pub extension: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    /// Route files (relative paths) with no backend tag.
    pub missing_backend_tags: Vec<String>,
    pub untagged_calls: Vec<UntaggedCall>,
    pub unresolved_calls: Vec<FrontendCall>,
    /// Declarations shadowed by an earlier one with the same key.
    pub duplicate_declarations: Vec<BackendDeclaration>,
}

impl CoverageReport {
    /// Duplicates are informational and do not count.
    pub fn is_clean(&self) -> bool {
        self.missing_backend_tags.is_empty()
            && self.untagged_calls.is_empty()
            && self.unresolved_calls.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.missing_backend_tags.len() + self.untagged_calls.len() + self.unresolved_calls.len()
    }
}

/// Configurable coverage checker.
pub struct CoverageChecker {
    /// File-name suffix identifying route handlers, e.g. `.handler.ts`.
    route_suffix: Option<String>,
    /// Substrings marking an API call line, e.g. `fetch(`.
    call_markers: Vec<String>,
    /// Workspace-relative directories skipped by both file checks.
    exclude_dirs: Vec<String>,
    lookback: usize,
}

impl Default for CoverageChecker {
    fn default() -> Self {
        Self {
            route_suffix: None,
            call_markers: vec!["fetch(".to_string()],
            exclude_dirs: Vec::new(),
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl CoverageChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route_suffix(mut self, suffix: &str) -> Self {
        self.route_suffix = Some(suffix.to_string());
        self
    }

    /// Replace the call markers. An empty list disables the call check.
    pub fn with_call_markers(mut self, markers: Vec<String>) -> Self {
        self.call_markers = markers;
        self
    }

    pub fn with_exclude_dir(mut self, dir: &str) -> Self {
        self.exclude_dirs.push(dir.trim_matches('/').to_string());
        self
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Run every check for one workspace root against a scan snapshot.
    pub async fn check(
        &self,
        root: &Path,
        config: &EndpointerConfig,
        snapshot: &ScanSnapshot,
    ) -> Result<CoverageReport> {
        let mut report = CoverageReport {
            unresolved_calls: snapshot
                .frontend
                .iter()
                .filter(|call| !snapshot.index.resolve_call(call).is_resolved())
                .cloned()
                .collect(),
            duplicate_declarations: snapshot.index.duplicates().to_vec(),
            ..Default::default()
        };

        if let Some(suffix) = &self.route_suffix {
            let files = self.discovery(FileDiscovery::for_side(&config.backend)).discover(root)?;
            for file in files.iter().filter(|f| file_name_ends_with(f, suffix)) {
                let Some(text) = read(file).await else {
                    continue;
                };
                if !has_backend_tag(&text) {
                    report.missing_backend_tags.push(relative(root, file));
                }
            }
        }

        if !self.call_markers.is_empty() {
            let files = self.discovery(FileDiscovery::for_side(&config.frontend)).discover(root)?;
            for file in &files {
                let Some(text) = read(file).await else {
                    continue;
                };
                let extension = file
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                for line in self.untagged_call_lines(&text) {
                    report.untagged_calls.push(UntaggedCall {
                        file: relative(root, file),
                        line: line + 1,
                        extension: extension.clone(),
                    });
                }
            }
        }

        tracing::info!("Coverage check: {} violations", report.violation_count());
        Ok(report)
    }

    /// 0-based lines containing a call marker without an unused frontend tag
    /// in the `lookback` lines above. Only the nearest tag is considered, and
    /// each tag covers one call.
    pub fn untagged_call_lines(&self, text: &str) -> Vec<usize> {
        let lines: Vec<&str> = text.lines().collect();
        let mut used: HashSet<usize> = HashSet::new();
        let mut untagged = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !self.call_markers.iter().any(|m| line.contains(m.as_str())) {
                continue;
            }
            let nearest = (1..=self.lookback)
                .take_while(|j| *j <= i)
                .map(|j| i - j)
                .find(|&k| line_has_tag(lines[k].trim(), TagKind::Frontend));
            match nearest {
                Some(k) if used.insert(k) => {}
                _ => untagged.push(i),
            }
        }

        untagged
    }

    fn discovery(&self, discovery: FileDiscovery) -> FileDiscovery {
        self.exclude_dirs
            .iter()
            .fold(discovery, |d, dir| d.with_exclude(&format!("{}/**", dir)))
    }
}

/// Whether any line carries a backend tag, well-formed or not.
pub fn has_backend_tag(text: &str) -> bool {
    text.lines().any(|line| line_has_tag(line, TagKind::Backend))
}

fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

fn relative(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

async fn read(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_directly_above_call() {
        let text = concat!(
            "// ENDPOINTER <frontend> method: \"GET\", endpoint: \"/users\"\n",
            "const res = await fetch(url);\n",
        );
        assert!(CoverageChecker::new().untagged_call_lines(text).is_empty());
    }

    #[test]
    fn test_tag_too_far_above() {
        let text = concat!(
            "// ENDPOINTER <frontend> method: \"GET\", endpoint: \"/users\"\n",
            "a\n",
            "b\n",
            "c\n",
            "fetch(url);\n",
        );
        assert_eq!(CoverageChecker::new().untagged_call_lines(text), vec![4]);
        assert!(
            CoverageChecker::new()
                .with_lookback(4)
                .untagged_call_lines(text)
                .is_empty()
        );
    }

    #[test]
    fn test_tag_covers_one_call() {
        let text = concat!(
            "  // ENDPOINTER <frontend> method: \"GET\", endpoint: \"/a\"\n",
            "fetch(a);\n",
            "fetch(b);\n",
        );
        assert_eq!(CoverageChecker::new().untagged_call_lines(text), vec![2]);
    }

    #[test]
    fn test_custom_markers() {
        let checker =
            CoverageChecker::new().with_call_markers(vec!["import.meta.env.VITE_API_ENDPOINT".into()]);
        let text = "fetch(x);\nconst u = import.meta.env.VITE_API_ENDPOINT + '/a';\n";
        assert_eq!(checker.untagged_call_lines(text), vec![1]);
        assert!(
            CoverageChecker::new()
                .with_call_markers(Vec::new())
                .untagged_call_lines(text)
                .is_empty()
        );
    }

    #[test]
    fn test_has_backend_tag() {
        assert!(has_backend_tag("x\n// ENDPOINTER <backend> TODO\n"));
        assert!(!has_backend_tag("// ENDPOINTER <frontend> method: \"GET\", endpoint: \"/a\"\n"));
    }
}
