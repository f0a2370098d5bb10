//! Isolated language-intelligence worker for the script pane.
//!
//! The worker owns a virtual file system and a type-checking engine bound to
//! it, and runs as its own task — the host never touches the environment
//! directly, only through the [`WorkerHandle`] RPC surface (message passing,
//! no shared memory).
//!
//! # Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`vfs`] | In-memory path → contents mapping backing the engine |
//! | [`engine`] | Type-checking engine seam + the shipped module-resolution engine |
//! | [`env`] | Virtual environment: file system + engine + entry file |
//! | [`imports`] | Bare-specifier discovery in script source |
//! | [`registry`] | Declaration-registry client (`/npm/@types/...` paths) |
//! | [`ata`] | Automatic type acquisition: fetch, merge, manifest post-pass |
//! | [`worker`] | The worker task and its request/response channel |
//!
//! # Degradation
//!
//! Every failure here is contained: a failed [`WorkerHandle::initialize`]
//! means language intelligence is unavailable, and per-package fetch
//! failures during acquisition reduce type information without ever
//! surfacing as a blocking error. Persistence and live sync never depend on
//! this crate.

pub mod ata;
pub mod engine;
pub mod env;
pub mod imports;
pub mod registry;
pub mod vfs;
pub mod worker;

pub use ata::{AtaReport, TypeAcquirer};
pub use engine::{Diagnostic, ImportResolverEngine, LanguageEngine};
pub use env::VirtualEnvironment;
pub use registry::{PackageManifest, RegistryError, TypeRegistry};
pub use vfs::VirtualFileSystem;
pub use worker::{WorkerConfig, WorkerError, WorkerHandle};
