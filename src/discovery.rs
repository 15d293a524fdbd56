//! File discovery module.
//!
//! Selects candidate files under a workspace folder while respecting
//! .gitignore rules and the process-wide exclude set.

use crate::config::SideConfig;
use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Discovers files in a workspace folder.
pub struct FileDiscovery {
    /// Restrict to these patterns (relative to the root); empty = everything
    include_patterns: Vec<String>,
    /// Additional ignore patterns
    exclude_patterns: Vec<String>,
    /// Whether to apply default excludes
    default_excludes: bool,
    /// Whether to include hidden files
    include_hidden: bool,
    /// Whether .gitignore files are honored
    respect_gitignore: bool,
    /// Whether to include large files
    include_large: bool,
    /// Max file size (bytes) unless include_large is set
    max_file_size: u64,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            default_excludes: true,
            include_hidden: false,
            respect_gitignore: true,
            include_large: false,
            max_file_size: 2 * 1024 * 1024,
        }
    }
}

impl FileDiscovery {
    /// Create a new unrestricted discovery with default excludes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovery restricted to one side's include folders and extensions.
    pub fn for_side(side: &SideConfig) -> Self {
        side_patterns(side)
            .iter()
            .fold(Self::new(), |discovery, pattern| discovery.with_include(pattern))
    }

    /// Add an include pattern.
    pub fn with_include(mut self, pattern: &str) -> Self {
        self.include_patterns.push(pattern.to_string());
        self
    }

    /// Add an exclude pattern.
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude_patterns.push(pattern.to_string());
        self
    }

    /// Disable default excludes.
    pub fn without_default_excludes(mut self) -> Self {
        self.default_excludes = false;
        self
    }

    /// Include hidden files.
    pub fn include_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    /// Walk files even if a .gitignore lists them.
    pub fn ignore_gitignore(mut self) -> Self {
        self.respect_gitignore = false;
        self
    }

    /// Include large files.
    pub fn include_large(mut self) -> Self {
        self.include_large = true;
        self
    }

    /// Override max file size.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Discover all matching files under the given root.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let excludes = self.exclude_set()?;
        let includes = build_globset(self.include_patterns.iter().map(|s| s.as_str()))?;
        let restricted = !self.include_patterns.is_empty();

        let walker = WalkBuilder::new(root)
            .hidden(!self.include_hidden)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .build();

        let mut files = Vec::<PathBuf>::new();

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path);
            if excludes.is_match(rel) {
                continue;
            }
            if restricted && !includes.is_match(rel) {
                continue;
            }

            if self.within_size_limit(path) {
                files.push(path.to_path_buf());
            } else {
                tracing::debug!("Skipping {}: over {} bytes", path.display(), self.max_file_size);
            }
        }

        Ok(files)
    }

    /// Check a file against the size limit.
    pub fn within_size_limit(&self, path: &Path) -> bool {
        if self.include_large {
            return true;
        }
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        metadata.len() <= self.max_file_size
    }

    fn exclude_set(&self) -> Result<GlobSet> {
        let defaults = if self.default_excludes {
            default_exclude_patterns()
        } else {
            Vec::new()
        };
        build_globset(
            defaults
                .into_iter()
                .chain(self.exclude_patterns.iter().map(|s| s.as_str())),
        )
    }
}

/// Matches workspace-relative paths against one side's include rules.
///
/// Used to filter already-scanned results the same way discovery selects
/// files, e.g. for a config-filtered list of frontend calls.
pub struct FileSelector {
    includes: GlobSet,
    restricted: bool,
}

impl FileSelector {
    pub fn new(side: &SideConfig) -> Result<Self> {
        let patterns = side_patterns(side);
        Ok(Self {
            includes: build_globset(patterns.iter().map(|s| s.as_str()))?,
            restricted: !patterns.is_empty(),
        })
    }

    /// Whether `path` is selected relative to any of `roots`.
    pub fn is_selected(&self, roots: &[PathBuf], path: &Path) -> bool {
        if !self.restricted {
            return true;
        }
        roots.iter().any(|root| {
            path.strip_prefix(root)
                .map(|rel| self.includes.is_match(rel))
                .unwrap_or(false)
        })
    }
}

/// Glob patterns for one side: folders × extensions, folders alone,
/// extensions alone, or nothing (unrestricted).
pub fn side_patterns(side: &SideConfig) -> Vec<String> {
    let folders: Vec<String> = side
        .include_folders
        .iter()
        .filter_map(|f| normalize_folder(f))
        .collect();
    let extensions: Vec<String> = side
        .include_extensions
        .iter()
        .filter_map(|e| normalize_extension(e))
        .collect();

    match (folders.is_empty(), extensions.is_empty()) {
        (true, true) => Vec::new(),
        (false, true) => folders.iter().map(|f| folder_glob(f, None)).collect(),
        (true, false) => extensions.iter().map(|e| format!("**/*.{}", e)).collect(),
        (false, false) => folders
            .iter()
            .flat_map(|f| extensions.iter().map(move |e| folder_glob(f, Some(e))))
            .collect(),
    }
}

fn folder_glob(folder: &str, extension: Option<&str>) -> String {
    match (folder.is_empty(), extension) {
        (true, None) => "**".to_string(),
        (true, Some(ext)) => format!("**/*.{}", ext),
        (false, None) => format!("{}/**", folder),
        (false, Some(ext)) => format!("{}/**/*.{}", folder, ext),
    }
}

/// `./src/api/` -> `src/api`; `.` and `./` -> `` (the root itself).
fn normalize_folder(folder: &str) -> Option<String> {
    let folder = folder.trim().replace('\\', "/");
    if folder.is_empty() {
        return None;
    }
    let folder = folder.trim_start_matches("./").trim_matches('/');
    if folder == "." {
        return Some(String::new());
    }
    Some(folder.to_string())
}

/// `.ts` / `ts` -> `ts`; `.handler.ts` -> `handler.ts`.
fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}

/// The process-wide exclude set.
pub fn default_exclude_patterns() -> Vec<&'static str> {
    vec![
        "**/.git/**",
        "**/.endpointer/**",
        "**/target/**",
        "**/node_modules/**",
        "**/dist/**",
        "**/build/**",
        "**/out/**",
        "**/coverage/**",
        "**/vendor/**",
        "**/.venv/**",
        "**/.next/**",
        "**/package-lock.json",
        "**/yarn.lock",
        "**/pnpm-lock.yaml",
        "**/Cargo.lock",
        "**/*.min.js",
        "**/*.min.css",
        "**/*.map",
        "**/*.png",
        "**/*.jpg",
        "**/*.jpeg",
        "**/*.gif",
        "**/*.webp",
        "**/*.pdf",
        "**/*.zip",
        "**/*.gz",
        "**/*.tar",
        "**/*.tgz",
        "**/*.jar",
        "**/*.wasm",
        "**/*.o",
        "**/*.a",
        "**/*.so",
        "**/*.dylib",
        "**/*.dll",
    ]
}

/// The default exclude set, compiled.
pub fn default_excludes() -> Result<GlobSet> {
    build_globset(default_exclude_patterns())
}

/// Invalid patterns are logged and left out of the set.
fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!("Ignoring pattern {:?}: {}", pattern, e),
        }
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(folders: &[&str], exts: &[&str]) -> SideConfig {
        SideConfig {
            include_folders: folders.iter().map(|s| s.to_string()).collect(),
            include_extensions: exts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_side_patterns_cross_product() {
        let patterns = side_patterns(&side(&["src/api", "./lib/"], &[".ts", "js"]));
        assert_eq!(
            patterns,
            vec![
                "src/api/**/*.ts",
                "src/api/**/*.js",
                "lib/**/*.ts",
                "lib/**/*.js",
            ]
        );
    }

    #[test]
    fn test_side_patterns_single_dimension() {
        assert_eq!(side_patterns(&side(&["server"], &[])), vec!["server/**"]);
        assert_eq!(
            side_patterns(&side(&[], &[".handler.ts"])),
            vec!["**/*.handler.ts"]
        );
        assert!(side_patterns(&side(&[], &[])).is_empty());
        assert!(side_patterns(&side(&["  "], &["."])).is_empty());
    }

    #[test]
    fn test_selector() {
        let roots = vec![PathBuf::from("/ws")];
        let selector = FileSelector::new(&side(&["web"], &["tsx"])).unwrap();
        assert!(selector.is_selected(&roots, Path::new("/ws/web/app/page.tsx")));
        assert!(!selector.is_selected(&roots, Path::new("/ws/web/app/page.ts")));
        assert!(!selector.is_selected(&roots, Path::new("/ws/server/page.tsx")));
        assert!(!selector.is_selected(&roots, Path::new("/elsewhere/web/page.tsx")));

        let open = FileSelector::new(&SideConfig::default()).unwrap();
        assert!(open.is_selected(&roots, Path::new("/elsewhere/x")));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let roots = vec![PathBuf::from("/ws")];
        let selector = FileSelector::new(&side(&[], &["{ts", "tsx"])).unwrap();
        assert!(selector.is_selected(&roots, Path::new("/ws/web/page.tsx")));
        assert!(!selector.is_selected(&roots, Path::new("/ws/web/page.ts")));

        // Nothing valid left: still restricted, so nothing is selected.
        let broken = FileSelector::new(&side(&[], &["{ts"])).unwrap();
        assert!(!broken.is_selected(&roots, Path::new("/ws/web/page.ts")));

        assert!(FileDiscovery::new().with_exclude("[").exclude_set().is_ok());
    }
}
