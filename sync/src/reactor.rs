//! Dependency-change reactors.
//!
//! Two independent consumers of the same event bus react to dependency
//! changes differently, and both are valid at once: the page reactor treats
//! an added package as not locally recoverable and requests a full reload
//! (a module graph cannot gain a previously-absent module without a fresh
//! load), while the language reactor only needs fresh type information and
//! requests a scoped re-acquisition. A removal is a no-op on both paths.
//!
//! Reactors emit commands on their own channels; the session decides what
//! executing a command means.

use inkpad_types::{DepChange, LiveEvent};
use tokio::sync::{broadcast, mpsc};

/// What the page reactor asks the embedder to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCommand {
    /// Reload the whole page.
    Reload,
}

/// What the language reactor asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangCommand {
    /// Re-run type acquisition against the current script text.
    Reacquire,
}

/// Consumes dependency events and requests page reloads on additions.
///
/// Runs until the bus or the command channel closes.
pub async fn run_page_reactor(
    mut events: broadcast::Receiver<LiveEvent>,
    commands: mpsc::Sender<PageCommand>,
) {
    loop {
        match events.recv().await {
            Ok(LiveEvent::Dep {
                change: DepChange::Add,
                package,
            }) => {
                tracing::info!(%package, "dependency added, requesting page reload");
                if commands.send(PageCommand::Reload).await.is_err() {
                    return;
                }
            }
            Ok(LiveEvent::Dep {
                change: DepChange::Remove,
                package,
            }) => {
                tracing::info!(%package, "dependency removed, nothing to do");
            }
            Ok(LiveEvent::Swap { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "page reactor lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Consumes dependency events and requests re-acquisition on additions.
pub async fn run_language_reactor(
    mut events: broadcast::Receiver<LiveEvent>,
    commands: mpsc::Sender<LangCommand>,
) {
    loop {
        match events.recv().await {
            Ok(LiveEvent::Dep {
                change: DepChange::Add,
                package,
            }) => {
                tracing::info!(%package, "dependency added, requesting type re-acquisition");
                if commands.send(LangCommand::Reacquire).await.is_err() {
                    return;
                }
            }
            Ok(LiveEvent::Dep {
                change: DepChange::Remove,
                package,
            }) => {
                tracing::debug!(%package, "dependency removed, type information kept as-is");
            }
            Ok(LiveEvent::Swap { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "language reactor lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
