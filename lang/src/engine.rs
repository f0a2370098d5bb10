//! Type-checking engine seam.
//!
//! The real compiler is an external collaborator: the runtime only needs
//! "a type-checking engine exposing file create/update and diagnostic
//! queries". [`ImportResolverEngine`] is the shipped implementation — it
//! resolves module references against the files it has been given, which is
//! exactly the part of checking that type acquisition changes. A full
//! checker slots in behind the same trait.

use std::collections::BTreeMap;

use crate::imports::{scan_imports, types_package_name};

/// A single engine finding for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Module specifier the finding concerns, when applicable.
    pub specifier: Option<String>,
}

impl Diagnostic {
    fn unresolved(package: &str) -> Self {
        Self {
            message: format!("cannot find module '{package}' or its type declarations"),
            specifier: Some(package.to_string()),
        }
    }
}

/// Engine surface the worker drives.
///
/// `create_file` and `update_file` must reflect immediately in subsequent
/// queries. Implementations own their file store; the virtual file system
/// remains the authoritative copy.
pub trait LanguageEngine: Send {
    /// Registers a file the engine has not seen before.
    fn create_file(&mut self, path: &str, contents: &str);

    /// Replaces the contents of a known file (or registers it — updates
    /// must be safe even if create was skipped).
    fn update_file(&mut self, path: &str, contents: &str);

    /// Whether the engine knows `path`.
    fn has_file(&self, path: &str) -> bool;

    /// Current findings for `path`. Unknown paths yield no findings.
    fn diagnostics(&self, path: &str) -> Vec<Diagnostic>;
}

#[derive(Debug, Clone)]
struct EngineFile {
    contents: String,
    version: u64,
}

/// Module-resolution engine: a bare import is an error until declarations
/// for it exist in the environment.
#[derive(Debug, Default)]
pub struct ImportResolverEngine {
    files: BTreeMap<String, EngineFile>,
}

impl ImportResolverEngine {
    /// An engine with no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine-internal version of `path`, for observing update counts.
    #[must_use]
    pub fn version(&self, path: &str) -> Option<u64> {
        self.files.get(path).map(|f| f.version)
    }

    fn resolves(&self, package: &str) -> bool {
        let direct = format!("/node_modules/{package}/");
        let typed = format!("/node_modules/@types/{}/", types_package_name(package));
        self.files
            .keys()
            .any(|path| path.starts_with(&direct) || path.starts_with(&typed))
    }
}

impl LanguageEngine for ImportResolverEngine {
    fn create_file(&mut self, path: &str, contents: &str) {
        self.files.insert(
            path.to_string(),
            EngineFile {
                contents: contents.to_string(),
                version: 1,
            },
        );
    }

    fn update_file(&mut self, path: &str, contents: &str) {
        self.files
            .entry(path.to_string())
            .and_modify(|file| {
                file.contents = contents.to_string();
                file.version += 1;
            })
            .or_insert_with(|| EngineFile {
                contents: contents.to_string(),
                version: 1,
            });
    }

    fn has_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn diagnostics(&self, path: &str) -> Vec<Diagnostic> {
        let Some(file) = self.files.get(path) else {
            return Vec::new();
        };

        scan_imports(&file.contents)
            .iter()
            .filter(|pkg| !self.resolves(pkg))
            .map(|pkg| Diagnostic::unresolved(pkg))
            .collect()
    }
}
