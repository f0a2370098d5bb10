//! In-memory file system backing the language engine.
//!
//! Exclusively owned and mutated by the worker task. Every path the live
//! engine is queried about must exist here first, or the engine reports the
//! file as absent.

use std::collections::BTreeMap;

/// Mapping from absolute path to file contents.
///
/// Paths are unique; a write replaces, never appends. Entries are not
/// deleted in normal operation — the mapping lives for the worker lifetime.
#[derive(Debug, Default, Clone)]
pub struct VirtualFileSystem {
    files: BTreeMap<String, String>,
}

impl VirtualFileSystem {
    /// An empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-or-replace `path` with `contents`.
    pub fn write(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Contents at `path`, if present.
    #[must_use]
    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Whether `path` exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the file system holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over `(path, contents)` in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Paths beginning with `prefix`, in order.
    pub fn paths_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.files
            .range(prefix.to_string()..)
            .take_while(move |(p, _)| p.starts_with(prefix))
            .map(|(p, _)| p.as_str())
    }
}
