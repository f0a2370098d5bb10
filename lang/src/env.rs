//! Virtual language environment: file system + engine + entry file.
//!
//! Built once by the worker's `initialize` and owned by the worker task for
//! its whole lifetime. The acquisition merge step goes through
//! [`VirtualEnvironment::upsert`], which keeps the file system and the
//! engine in lockstep.

use crate::engine::{Diagnostic, LanguageEngine};
use crate::vfs::VirtualFileSystem;

/// Minimal package descriptor the environment is seeded with.
pub const PACKAGE_DESCRIPTOR_PATH: &str = "/package.json";
const PACKAGE_DESCRIPTOR: &str = r#"{ "type": "module" }"#;

/// The worker-side environment: an in-memory file system and a
/// type-checking engine bound to it.
pub struct VirtualEnvironment {
    vfs: VirtualFileSystem,
    engine: Box<dyn LanguageEngine>,
    entry_path: String,
}

impl VirtualEnvironment {
    /// Builds the environment, seeding the package descriptor and an empty
    /// entry file so the engine can be queried immediately.
    pub fn new(engine: Box<dyn LanguageEngine>, entry_path: impl Into<String>) -> Self {
        let mut env = Self {
            vfs: VirtualFileSystem::new(),
            engine,
            entry_path: entry_path.into(),
        };
        env.upsert(PACKAGE_DESCRIPTOR_PATH, PACKAGE_DESCRIPTOR);
        let entry = env.entry_path.clone();
        env.upsert(&entry, "");
        env
    }

    /// Idempotent create-or-update visible to the live engine immediately.
    ///
    /// Create vs update is chosen by file existence, not content, so
    /// repeated merges are safe even if engine-internal versioning differs.
    pub fn upsert(&mut self, path: &str, contents: &str) {
        self.vfs.write(path, contents);
        if self.engine.has_file(path) {
            self.engine.update_file(path, contents);
        } else {
            self.engine.create_file(path, contents);
        }
    }

    /// Re-synchronizes the entry file into the engine from the file
    /// system's authoritative copy.
    ///
    /// Guards against drift when an acquisition pass itself wrote to the
    /// entry path.
    pub fn resync_entry(&mut self) {
        let contents = self.vfs.read(&self.entry_path).unwrap_or("").to_string();
        self.engine.update_file(&self.entry_path, &contents);
    }

    /// Current findings for `path`.
    #[must_use]
    pub fn diagnostics(&self, path: &str) -> Vec<Diagnostic> {
        self.engine.diagnostics(path)
    }

    /// The primary script file's path.
    #[must_use]
    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    /// The backing file system (internal accessor for the merge step).
    #[must_use]
    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    /// Whether the live engine knows `path`.
    #[must_use]
    pub fn engine_has_file(&self, path: &str) -> bool {
        self.engine.has_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImportResolverEngine;

    fn env() -> VirtualEnvironment {
        VirtualEnvironment::new(Box::new(ImportResolverEngine::new()), "script.js")
    }

    #[test]
    fn seeds_package_descriptor_and_entry() {
        let env = env();
        assert_eq!(
            env.vfs().read(PACKAGE_DESCRIPTOR_PATH),
            Some(r#"{ "type": "module" }"#)
        );
        assert_eq!(env.vfs().read("script.js"), Some(""));
        assert!(env.engine_has_file("script.js"));
    }

    #[test]
    fn upsert_is_visible_in_vfs_and_engine() {
        let mut env = env();
        env.upsert("script.js", "import x from 'ms'");
        assert_eq!(env.vfs().read("script.js"), Some("import x from 'ms'"));
        assert_eq!(env.diagnostics("script.js").len(), 1);
    }

    #[test]
    fn double_upsert_matches_single_observable_state() {
        let mut a = env();
        a.upsert("/d.ts", "declare const x: 1;");

        let mut b = env();
        b.upsert("/d.ts", "declare const x: 1;");
        b.upsert("/d.ts", "declare const x: 1;");

        let a_files: Vec<(String, String)> = a
            .vfs()
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        let b_files: Vec<(String, String)> = b
            .vfs()
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        assert_eq!(a_files, b_files);
        assert_eq!(a.diagnostics("/d.ts"), b.diagnostics("/d.ts"));
    }

    #[test]
    fn resync_entry_restores_engine_copy_from_vfs() {
        let mut env = env();
        env.upsert("script.js", "import x from 'ms'");
        env.resync_entry();
        assert_eq!(env.diagnostics("script.js").len(), 1);
    }
}
