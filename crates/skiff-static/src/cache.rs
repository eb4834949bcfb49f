//! Dependency cache.
//!
//! Maps every compiled source file to the local files it imports and the
//! output files last produced from it. The cache lives as long as the
//! builder; a one-shot build starts empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Cached facts about one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    /// Local imports found at the last compile
    pub local_dependencies: Vec<PathBuf>,

    /// Output files produced from the source
    pub route_paths: Vec<PathBuf>,
}

/// Source path → [`CacheEntry`], keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct DependencyCache {
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recorded imports of `source`.
    pub fn record_dependencies(&mut self, source: &Path, dependencies: Vec<PathBuf>) {
        self.entries
            .entry(source.to_path_buf())
            .or_default()
            .local_dependencies = dependencies;
    }

    /// Sources importing `changed`, in path order.
    pub fn dependents_of(&self, changed: &Path) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.local_dependencies.iter().any(|d| d == changed))
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Output files last produced from `source`. Empty for unknown paths.
    pub fn outputs_of(&self, source: &Path) -> &[PathBuf] {
        self.entries
            .get(source)
            .map(|entry| entry.route_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Attribute `output` to `source`.
    pub fn record_output(&mut self, source: &Path, output: PathBuf) {
        let outputs = &mut self.entries.entry(source.to_path_buf()).or_default().route_paths;
        if !outputs.contains(&output) {
            outputs.push(output);
        }
    }

    /// Drop the outputs attributed to `source`, returning them.
    pub fn clear_outputs(&mut self, source: &Path) -> Vec<PathBuf> {
        self.entries
            .get_mut(source)
            .map(|entry| std::mem::take(&mut entry.route_paths))
            .unwrap_or_default()
    }

    /// Remove the entry of `source`.
    pub fn forget(&mut self, source: &Path) -> Option<CacheEntry> {
        self.entries.remove(source)
    }

    pub fn entry(&self, source: &Path) -> Option<&CacheEntry> {
        self.entries.get(source)
    }

    /// Cached sources at or below `path`.
    pub fn sources_under(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .keys()
            .filter(|source| source.starts_with(path))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
