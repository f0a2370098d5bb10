//! The page session: one editing surface, wired end to end.
//!
//! [`EditorSession`] owns the four pane controllers, the live sync channel
//! and its reactors, the rendered preview, and the lazily started language
//! worker. It is the only place the crates below are wired together:
//!
//! - local edits flow through pane controllers into coalesced
//!   fire-and-forget persistence writes;
//! - flushed markup feeds the attribute indexer and regenerates the ambient
//!   declaration file inside the worker; flushed script text updates the
//!   worker's copy of the entry file;
//! - live sync swaps update the preview (reinjecting marked scripts) and
//!   the panes' remote state; dependency additions fan out to both the page
//!   reactor (reload) and the language reactor (re-acquisition).
//!
//! The worker is started at most once per session, on first need. A failed
//! start is remembered: language intelligence stays unavailable while
//! editing and persistence continue unaffected.

pub mod config;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use inkpad_editor::{
    document_ambient_types, AttributeScanner, PaneController, PaneWriter, PersistClient,
    PersistError, RegexScanner, AMBIENT_TYPES_PATH,
};
use inkpad_lang::{TypeRegistry, WorkerConfig, WorkerHandle};
use inkpad_sync::{
    run_language_reactor, run_legacy_feed, run_page_reactor, ChannelState, LangCommand,
    LegacyEvent, LiveSyncChannel, PageCommand, PreviewDocument, ScriptRunner, TransportEvent,
};
use inkpad_types::{LiveEvent, Pane};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, OnceCell};

pub use config::{InitialTexts, SessionConfig, SessionConfigError};

/// Failed to assemble a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration didn't validate.
    #[error(transparent)]
    Config(#[from] SessionConfigError),
    /// Persistence client construction failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// A live editing session over one document.
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    panes: BTreeMap<Pane, PaneController>,
    worker: OnceCell<Option<WorkerHandle>>,
    channel: LiveSyncChannel,
    preview: Mutex<PreviewDocument>,
    scanner: RegexScanner,
}

/// Forwards persisted snapshots to the session on top of the real writer,
/// so worker updates ride the same flush that triggered the write.
struct TeeWriter {
    inner: Arc<dyn PaneWriter>,
    taps: mpsc::UnboundedSender<(Pane, String)>,
}

impl PaneWriter for TeeWriter {
    fn write(&self, pane: Pane, text: String) {
        let _ = self.taps.send((pane, text.clone()));
        self.inner.write(pane, text);
    }
}

impl EditorSession {
    /// Builds the session and spawns its background tasks.
    ///
    /// The returned receiver carries page-level commands (currently only
    /// reload requests); executing them is the embedder's job.
    pub fn start(
        config: SessionConfig,
        runner: Arc<dyn ScriptRunner>,
    ) -> Result<(Self, mpsc::Receiver<PageCommand>), SessionError> {
        let persist: Arc<dyn PaneWriter> =
            Arc::new(PersistClient::new(config.persist_base.clone())?);
        let (tap_tx, tap_rx) = mpsc::unbounded_channel();
        let writer: Arc<dyn PaneWriter> = Arc::new(TeeWriter {
            inner: persist,
            taps: tap_tx,
        });

        let mut panes = BTreeMap::new();
        for pane in Pane::ALL {
            panes.insert(
                pane,
                PaneController::with_profile(
                    pane,
                    config.initial.for_pane(pane),
                    config.profile(pane),
                    writer.clone(),
                ),
            );
        }

        let channel = LiveSyncChannel::new();
        let inner = Arc::new(SessionInner {
            preview: Mutex::new(PreviewDocument::new(runner)),
            panes,
            worker: OnceCell::new(),
            channel: channel.clone(),
            scanner: RegexScanner,
            config,
        });

        tokio::spawn(run_flush_taps(inner.clone(), tap_rx));
        tokio::spawn(run_swap_consumer(inner.clone(), channel.subscribe()));

        let (page_tx, page_rx) = mpsc::channel(8);
        tokio::spawn(run_page_reactor(channel.subscribe(), page_tx));

        let (lang_tx, lang_rx) = mpsc::channel(8);
        tokio::spawn(run_language_reactor(channel.subscribe(), lang_tx));
        tokio::spawn(run_lang_commands(inner.clone(), lang_rx));

        Ok((Self { inner }, page_rx))
    }

    /// Parses `json` into a config and starts the session.
    pub fn start_from_json(
        json: &str,
        runner: Arc<dyn ScriptRunner>,
    ) -> Result<(Self, mpsc::Receiver<PageCommand>), SessionError> {
        let config = SessionConfig::from_json(json)?;
        Self::start(config, runner)
    }

    /// Change-notification hook for the document provider of `pane`.
    pub fn notify_change(&self, pane: Pane, snapshot: impl Into<String>) {
        if let Some(controller) = self.inner.panes.get(&pane) {
            controller.notify_change(snapshot);
        }
    }

    /// Current text of `pane`.
    #[must_use]
    pub fn pane_text(&self, pane: Pane) -> String {
        self.inner
            .panes
            .get(&pane)
            .map(PaneController::text)
            .unwrap_or_default()
    }

    /// Feeds the live sync channel from a transport event stream.
    pub fn attach_transport(&self, transport: mpsc::Receiver<TransportEvent>) {
        tokio::spawn(self.inner.channel.clone().run(transport));
    }

    /// Feeds swap events from the legacy named-event transport.
    pub fn attach_legacy_feed(&self, feed: mpsc::Receiver<LegacyEvent>) {
        tokio::spawn(run_legacy_feed(self.inner.channel.clone(), feed));
    }

    /// Current live sync channel state.
    #[must_use]
    pub fn channel_state(&self) -> ChannelState {
        self.inner.channel.state()
    }

    /// The language worker, starting it on first call.
    ///
    /// `None` means startup failed for this session; the failure is
    /// remembered and not retried.
    pub async fn language(&self) -> Option<WorkerHandle> {
        self.inner.language().await
    }

    /// Current rendered head markup.
    #[must_use]
    pub fn preview_head(&self) -> String {
        self.inner
            .preview
            .lock()
            .map(|p| p.head().to_string())
            .unwrap_or_default()
    }

    /// Current rendered body markup.
    #[must_use]
    pub fn preview_body(&self) -> String {
        self.inner
            .preview
            .lock()
            .map(|p| p.body().to_string())
            .unwrap_or_default()
    }
}

impl SessionInner {
    /// Single-flight worker startup; the outcome, success or failure, is
    /// memoized for the session's lifetime.
    async fn language(&self) -> Option<WorkerHandle> {
        self.worker
            .get_or_init(|| async {
                let registry = match TypeRegistry::new(self.config.registry_base.clone()) {
                    Ok(registry) => registry,
                    Err(e) => {
                        tracing::warn!("language intelligence unavailable: {e}");
                        return None;
                    }
                };
                let mut worker_config = WorkerConfig::new(registry);
                worker_config.entry_path.clone_from(&self.config.entry_path);
                worker_config.base_libs.clone_from(&self.config.base_libs);

                let handle = WorkerHandle::spawn(worker_config);
                match handle.initialize().await {
                    Ok(()) => {
                        self.seed_worker(&handle).await;
                        Some(handle)
                    }
                    Err(e) => {
                        tracing::warn!("language intelligence unavailable: {e}");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Pushes the current script and ambient declarations into a freshly
    /// initialized worker.
    async fn seed_worker(&self, worker: &WorkerHandle) {
        if let Some(script) = self.panes.get(&Pane::Script) {
            if let Err(e) = worker
                .update_file(&self.config.entry_path, &script.text())
                .await
            {
                tracing::debug!("seeding script text failed: {e}");
            }
        }
        self.refresh_ambient_types(worker).await;
    }

    /// Rescans both markup panes and regenerates the ambient declaration
    /// file inside the worker.
    async fn refresh_ambient_types(&self, worker: &WorkerHandle) {
        let mut ids = BTreeSet::new();
        let mut classes = BTreeSet::new();
        for pane in Pane::ALL.into_iter().filter(|p| p.is_markup()) {
            if let Some(controller) = self.panes.get(&pane) {
                let text = controller.text();
                ids.extend(self.scanner.scan(&text, "id"));
                classes.extend(self.scanner.scan(&text, "class"));
            }
        }
        let declarations = document_ambient_types(&ids, &classes);
        if let Err(e) = worker.update_file(AMBIENT_TYPES_PATH, &declarations).await {
            tracing::debug!("ambient declaration update failed: {e}");
        }
    }
}

/// Consumes flush taps: every persisted snapshot also updates the worker's
/// view of the world.
async fn run_flush_taps(
    inner: Arc<SessionInner>,
    mut taps: mpsc::UnboundedReceiver<(Pane, String)>,
) {
    while let Some((pane, text)) = taps.recv().await {
        let Some(worker) = inner.language().await else {
            continue;
        };
        match pane {
            Pane::Script => {
                if let Err(e) = worker.update_file(&inner.config.entry_path, &text).await {
                    tracing::debug!("script update failed: {e}");
                }
            }
            Pane::Head | Pane::Body => inner.refresh_ambient_types(&worker).await,
            Pane::Style => {}
        }
    }
}

/// Applies swap events to the preview and the panes' remote state.
async fn run_swap_consumer(inner: Arc<SessionInner>, mut events: broadcast::Receiver<LiveEvent>) {
    loop {
        match events.recv().await {
            Ok(LiveEvent::Swap { target, content }) => {
                if let Ok(mut preview) = inner.preview.lock() {
                    preview.apply_swap(target, &content);
                }
                if let Some(controller) = inner.panes.get(&target.pane()) {
                    controller.apply_remote(content);
                }
            }
            Ok(LiveEvent::Dep { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "swap consumer lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Executes language reactor commands: re-run acquisition against the
/// current script text.
async fn run_lang_commands(inner: Arc<SessionInner>, mut commands: mpsc::Receiver<LangCommand>) {
    while let Some(LangCommand::Reacquire) = commands.recv().await {
        let Some(worker) = inner.language().await else {
            continue;
        };
        let script = inner
            .panes
            .get(&Pane::Script)
            .map(PaneController::text)
            .unwrap_or_default();
        match worker.run_ata(&script).await {
            Ok(report) => {
                tracing::info!(
                    packages = report.packages.len(),
                    failures = report.failures.len(),
                    "re-acquisition finished"
                );
            }
            Err(e) => tracing::debug!("re-acquisition failed: {e}"),
        }
    }
}
