//! The language worker task and its request channel.
//!
//! The worker runs as a dedicated tokio task owning the virtual environment
//! and the type acquirer. Hosts talk to it through a cloneable
//! [`WorkerHandle`]: each request carries a oneshot reply channel, and the
//! task processes requests strictly in arrival order, so overlapping
//! acquisition passes each resolve with their own result.

use tokio::sync::{mpsc, oneshot};

use crate::ata::{AtaReport, TypeAcquirer};
use crate::engine::{Diagnostic, ImportResolverEngine, LanguageEngine};
use crate::env::VirtualEnvironment;
use crate::registry::TypeRegistry;

/// Default path of the script pane's file inside the environment.
pub const DEFAULT_ENTRY_PATH: &str = "script.js";

const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// How the worker builds its environment at `initialize`.
pub struct WorkerConfig {
    /// Registry the acquirer and base-library fetches go through.
    pub registry: TypeRegistry,
    /// Path of the primary script file.
    pub entry_path: String,
    /// Registry paths of base library declarations fetched at initialize.
    /// Any failure here fails initialization as a whole.
    pub base_libs: Vec<String>,
}

impl WorkerConfig {
    /// Config with the default entry path and no base libraries.
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            entry_path: DEFAULT_ENTRY_PATH.to_string(),
            base_libs: Vec::new(),
        }
    }
}

/// Failures crossing the worker boundary.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WorkerError {
    /// A request arrived before a successful `initialize`.
    #[error("language worker is not initialized")]
    NotInitialized,
    /// Environment construction failed; the worker stays uninitialized.
    #[error("language worker failed to initialize: {0}")]
    InitFailed(String),
    /// The worker task is gone.
    #[error("language worker channel closed")]
    ChannelClosed,
}

enum WorkerRequest {
    Initialize {
        reply: oneshot::Sender<Result<(), WorkerError>>,
    },
    UpdateFile {
        path: String,
        contents: String,
        reply: oneshot::Sender<Result<(), WorkerError>>,
    },
    RunAta {
        source: String,
        reply: oneshot::Sender<Result<AtaReport, WorkerError>>,
    },
    Diagnostics {
        path: String,
        reply: oneshot::Sender<Result<Vec<Diagnostic>, WorkerError>>,
    },
}

/// Cloneable client half of the worker channel.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerRequest>,
}

impl WorkerHandle {
    /// Spawns a worker with the shipped module-resolution engine.
    #[must_use]
    pub fn spawn(config: WorkerConfig) -> Self {
        Self::spawn_with_engine(config, || Box::new(ImportResolverEngine::new()))
    }

    /// Spawns a worker with a custom engine behind the seam.
    pub fn spawn_with_engine<F>(config: WorkerConfig, make_engine: F) -> Self
    where
        F: FnOnce() -> Box<dyn LanguageEngine> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let worker = Worker {
            acquirer: TypeAcquirer::new(config.registry.clone()),
            config,
            make_engine: Some(Box::new(make_engine)),
            env: None,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, WorkerError>>) -> WorkerRequest,
    ) -> Result<T, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        rx.await.map_err(|_| WorkerError::ChannelClosed)?
    }

    /// Builds the environment: base libraries, package descriptor, empty
    /// entry file. Idempotent once it has succeeded.
    pub async fn initialize(&self) -> Result<(), WorkerError> {
        self.request(|reply| WorkerRequest::Initialize { reply }).await
    }

    /// Pushes new contents for `path` into the environment.
    pub async fn update_file(&self, path: &str, contents: &str) -> Result<(), WorkerError> {
        self.request(|reply| WorkerRequest::UpdateFile {
            path: path.to_string(),
            contents: contents.to_string(),
            reply,
        })
        .await
    }

    /// Runs an acquisition pass over `source` and waits for its report.
    pub async fn run_ata(&self, source: &str) -> Result<AtaReport, WorkerError> {
        self.request(|reply| WorkerRequest::RunAta {
            source: source.to_string(),
            reply,
        })
        .await
    }

    /// Current engine findings for `path`.
    pub async fn diagnostics(&self, path: &str) -> Result<Vec<Diagnostic>, WorkerError> {
        self.request(|reply| WorkerRequest::Diagnostics {
            path: path.to_string(),
            reply,
        })
        .await
    }
}

struct Worker {
    config: WorkerConfig,
    acquirer: TypeAcquirer,
    make_engine: Option<Box<dyn FnOnce() -> Box<dyn LanguageEngine> + Send>>,
    env: Option<VirtualEnvironment>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<WorkerRequest>) {
        while let Some(request) = rx.recv().await {
            match request {
                WorkerRequest::Initialize { reply } => {
                    let result = self.initialize().await;
                    let _ = reply.send(result);
                }
                WorkerRequest::UpdateFile {
                    path,
                    contents,
                    reply,
                } => {
                    let result = match self.env.as_mut() {
                        Some(env) => {
                            env.upsert(&path, &contents);
                            Ok(())
                        }
                        None => Err(WorkerError::NotInitialized),
                    };
                    let _ = reply.send(result);
                }
                WorkerRequest::RunAta { source, reply } => {
                    let result = match self.env.as_mut() {
                        Some(env) => Ok(self.acquirer.run(&source, env).await),
                        None => Err(WorkerError::NotInitialized),
                    };
                    let _ = reply.send(result);
                }
                WorkerRequest::Diagnostics { path, reply } => {
                    let result = match self.env.as_ref() {
                        Some(env) => Ok(env.diagnostics(&path)),
                        None => Err(WorkerError::NotInitialized),
                    };
                    let _ = reply.send(result);
                }
            }
        }
        tracing::debug!("language worker channel closed, task exiting");
    }

    async fn initialize(&mut self) -> Result<(), WorkerError> {
        if self.env.is_some() {
            tracing::debug!("language worker already initialized");
            return Ok(());
        }

        // Fetch every base library before touching the engine factory, so a
        // failed attempt leaves the worker able to retry.
        let mut libs = Vec::with_capacity(self.config.base_libs.len());
        for path in &self.config.base_libs {
            let contents = self
                .config
                .registry
                .raw_file(path)
                .await
                .map_err(|e| WorkerError::InitFailed(e.to_string()))?;
            let name = path.rsplit('/').next().unwrap_or(path);
            libs.push((format!("/{name}"), contents));
        }

        let Some(make_engine) = self.make_engine.take() else {
            return Err(WorkerError::InitFailed("engine already consumed".into()));
        };
        let mut env = VirtualEnvironment::new(make_engine(), &self.config.entry_path);
        for (path, contents) in &libs {
            env.upsert(path, contents);
        }

        tracing::info!(
            entry = %self.config.entry_path,
            base_libs = libs.len(),
            "language worker initialized"
        );
        self.env = Some(env);
        Ok(())
    }
}
