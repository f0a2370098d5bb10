//! Automatic type acquisition.
//!
//! Given a snapshot of the script pane, discover the external packages it
//! references, fetch their declaration files from the registry (following
//! declared dependencies and reference directives transitively), and merge
//! the results into the virtual environment.
//!
//! Per-package fetch failures never abort a pass: whatever succeeded is
//! merged and the rest is skipped, degrading type information instead of
//! crashing.

use std::collections::{BTreeSet, VecDeque};

use tokio::sync::oneshot;

use crate::env::VirtualEnvironment;
use crate::imports::{scan_imports, scan_reference_types, types_package_name};
use crate::registry::TypeRegistry;

/// Ceiling on distinct packages touched in one pass.
const MAX_PACKAGES_PER_PASS: usize = 64;

/// Result of one acquisition pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtaReport {
    /// Packages whose declarations were merged this pass.
    pub packages: Vec<String>,
    /// Number of files written into the environment.
    pub files_merged: usize,
    /// Packages that could not be resolved (missing or fetch failure).
    pub failures: Vec<String>,
}

/// One in-flight acquisition pass, tracked by a completion signal that
/// resolves exactly once.
///
/// The signal is created before any fetching starts, so every invocation
/// gets a deterministic completion even when invocations overlap: sessions
/// never cancel each other, they are only superseded in relevance.
struct AcquisitionSession {
    done_tx: Option<oneshot::Sender<AtaReport>>,
    done_rx: oneshot::Receiver<AtaReport>,
}

impl AcquisitionSession {
    fn new() -> Self {
        let (done_tx, done_rx) = oneshot::channel();
        Self {
            done_tx: Some(done_tx),
            done_rx,
        }
    }

    /// Resolves the completion signal. Later calls are no-ops.
    fn finish(&mut self, report: AtaReport) {
        if let Some(tx) = self.done_tx.take() {
            let _ = tx.send(report);
        }
    }

    /// Waits for the signal. A session dropped unresolved yields an empty
    /// report rather than hanging the caller.
    async fn wait(self) -> AtaReport {
        match self.done_rx.await {
            Ok(report) => report,
            Err(_) => {
                tracing::warn!("acquisition session ended without resolving");
                AtaReport::default()
            }
        }
    }
}

/// Work item in the acquisition walk.
enum Fetch {
    /// A directly imported package: manifest plus entry declarations.
    Full(String),
    /// A transitively discovered `@types` directory. The fetch engine skips
    /// manifests for these; the merge post-pass fills them in.
    DeclOnly(String),
}

struct FetchOutcome {
    files: Vec<(String, String)>,
    packages: Vec<String>,
    failures: Vec<String>,
}

/// Drives acquisition passes against one registry.
///
/// Remembers which packages already merged during this worker lifetime, so
/// re-triggered passes (dependency changes, repeated edits) only fetch what
/// is new.
pub struct TypeAcquirer {
    registry: TypeRegistry,
    acquired: BTreeSet<String>,
}

impl TypeAcquirer {
    /// An acquirer with an empty acquisition history.
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            acquired: BTreeSet::new(),
        }
    }

    /// Runs one acquisition pass for `source` and merges into `env`.
    ///
    /// Establishes a fresh session, delegates to the fetch walk, merges,
    /// and resolves the session's completion signal exactly once.
    pub async fn run(&mut self, source: &str, env: &mut VirtualEnvironment) -> AtaReport {
        let mut session = AcquisitionSession::new();
        self.trigger(source, env, &mut session).await;
        session.wait().await
    }

    async fn trigger(
        &mut self,
        source: &str,
        env: &mut VirtualEnvironment,
        session: &mut AcquisitionSession,
    ) {
        let outcome = self.fetch_declarations(source).await;

        let mut files_merged = 0;
        for (path, contents) in &outcome.files {
            // Existence, not content, decides create vs update — repeated
            // runs stay safe even if engine-internal versioning differs.
            env.upsert(path, contents);
            files_merged += 1;
        }

        // Post-pass: declaration directories that arrived without their own
        // manifest get one fetched by name and inserted at the conventional
        // path. The fetch walk does not always include manifests for
        // transitively discovered packages.
        for types_dir in missing_manifests(&outcome.files, env) {
            match self.registry.types_manifest(&types_dir).await {
                Ok((raw, _)) => {
                    env.upsert(
                        &format!("/node_modules/@types/{types_dir}/package.json"),
                        &raw,
                    );
                    files_merged += 1;
                }
                Err(e) => {
                    tracing::debug!(package = %types_dir, "manifest post-pass skipped: {e}");
                }
            }
        }

        // The acquisition may have touched the entry path; the file
        // system's copy is authoritative.
        env.resync_entry();

        if !outcome.failures.is_empty() {
            tracing::debug!(failed = ?outcome.failures, "acquisition merged partial results");
        }

        session.finish(AtaReport {
            packages: outcome.packages,
            files_merged,
            failures: outcome.failures,
        });
    }

    async fn fetch_declarations(&mut self, source: &str) -> FetchOutcome {
        let mut queue: VecDeque<Fetch> = scan_imports(source)
            .into_iter()
            .filter(|pkg| !self.acquired.contains(pkg))
            .map(Fetch::Full)
            .collect();

        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut files = Vec::new();
        let mut packages = Vec::new();
        let mut failures = Vec::new();

        while let Some(fetch) = queue.pop_front() {
            if visited.len() >= MAX_PACKAGES_PER_PASS {
                tracing::warn!("acquisition pass hit its package ceiling, stopping walk");
                break;
            }

            match fetch {
                Fetch::Full(pkg) => {
                    let types_dir = types_package_name(&pkg);
                    if !visited.insert(types_dir.clone()) {
                        continue;
                    }
                    match self.registry.types_manifest(&types_dir).await {
                        Ok((raw, manifest)) => {
                            files.push((
                                format!("/node_modules/@types/{types_dir}/package.json"),
                                raw,
                            ));
                            for dep in manifest.dependencies.keys() {
                                if let Some(name) = dep.strip_prefix("@types/") {
                                    queue.push_back(Fetch::DeclOnly(name.to_string()));
                                }
                            }
                            let entry = manifest.entry_point().to_string();
                            match self.registry.types_file(&types_dir, &entry).await {
                                Ok(text) => {
                                    for referenced in scan_reference_types(&text) {
                                        queue.push_back(Fetch::DeclOnly(types_package_name(
                                            &referenced,
                                        )));
                                    }
                                    files.push((
                                        format!("/node_modules/@types/{types_dir}/{entry}"),
                                        text,
                                    ));
                                    self.acquired.insert(pkg.clone());
                                    packages.push(pkg);
                                }
                                Err(e) => {
                                    tracing::debug!(package = %pkg, "declaration fetch failed: {e}");
                                    failures.push(pkg);
                                }
                            }
                        }
                        Err(e) => {
                            tracing::debug!(package = %pkg, "manifest fetch failed: {e}");
                            failures.push(pkg);
                        }
                    }
                }
                Fetch::DeclOnly(types_dir) => {
                    if !visited.insert(types_dir.clone()) {
                        continue;
                    }
                    match self.registry.types_file(&types_dir, "index.d.ts").await {
                        Ok(text) => {
                            for referenced in scan_reference_types(&text) {
                                queue.push_back(Fetch::DeclOnly(types_package_name(&referenced)));
                            }
                            files.push((
                                format!("/node_modules/@types/{types_dir}/index.d.ts"),
                                text,
                            ));
                        }
                        Err(e) => {
                            tracing::debug!(package = %types_dir, "declaration fetch failed: {e}");
                            failures.push(types_dir);
                        }
                    }
                }
            }
        }

        FetchOutcome {
            files,
            packages,
            failures,
        }
    }
}

/// Declaration directories in the fetched set whose manifest is absent from
/// the environment after the merge.
fn missing_manifests(files: &[(String, String)], env: &VirtualEnvironment) -> BTreeSet<String> {
    let mut dirs = BTreeSet::new();
    for (path, _) in files {
        if let Some(rest) = path.strip_prefix("/node_modules/@types/")
            && let Some((dir, _)) = rest.split_once('/')
        {
            dirs.insert(dir.to_string());
        }
    }
    dirs.retain(|dir| {
        !env.vfs()
            .contains(&format!("/node_modules/@types/{dir}/package.json"))
    });
    dirs
}
