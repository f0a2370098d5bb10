//! Pane controller — one per document region.
//!
//! Owns the editor-facing text snapshot and the last-persisted marker, and
//! wires change notifications through a per-pane [`Coalescer`]. A flush takes
//! only the most recent snapshot in the window; earlier ones are superseded.

use std::sync::{Arc, RwLock};

use inkpad_types::{DebounceProfile, Pane};

use crate::coalesce::Coalescer;

/// Destination for persistence writes.
///
/// Implementations are fire-and-forget: they must not block the flush path.
/// [`crate::PersistClient`] is the production implementation; tests record.
pub trait PaneWriter: Send + Sync + 'static {
    /// Persist the full current text of `pane`.
    fn write(&self, pane: Pane, text: String);
}

/// Controller for a single pane.
///
/// Lives for the page session; created once from the server-provided initial
/// text and never explicitly destroyed.
pub struct PaneController {
    pane: Pane,
    current: Arc<RwLock<String>>,
    updates: Coalescer<String>,
}

impl PaneController {
    /// Creates a controller with the pane's default coalescing profile.
    pub fn new(pane: Pane, initial: impl Into<String>, writer: Arc<dyn PaneWriter>) -> Self {
        Self::with_profile(pane, initial, pane.debounce_profile(), writer)
    }

    /// Creates a controller with an explicit coalescing profile.
    pub fn with_profile(
        pane: Pane,
        initial: impl Into<String>,
        profile: DebounceProfile,
        writer: Arc<dyn PaneWriter>,
    ) -> Self {
        let initial = initial.into();
        let current = Arc::new(RwLock::new(initial.clone()));

        // The last-written marker is owned exclusively by the flush task;
        // nothing outside this closure ever touches it.
        let mut last_saved = initial;
        let updates = Coalescer::new(profile.delay, profile.max_buffer, move |mut snapshots: Vec<String>| {
            if let Some(text) = snapshots.pop()
                && text != last_saved
            {
                // Advance the marker before the write resolves. A failed
                // write leaves the server stale until the next differing
                // edit; there is no retry.
                last_saved = text.clone();
                writer.write(pane, text);
            }
            async {}
        });

        Self {
            pane,
            current,
            updates,
        }
    }

    /// Which pane this controller owns.
    #[must_use]
    pub fn pane(&self) -> Pane {
        self.pane
    }

    /// Change-notification hook for the document provider.
    ///
    /// Each notification carries the latest full snapshot. This is the sole
    /// path by which local edits reach persisted storage.
    pub fn notify_change(&self, snapshot: impl Into<String>) {
        let snapshot = snapshot.into();
        if let Ok(mut current) = self.current.write() {
            current.clone_from(&snapshot);
        }
        self.updates.push(snapshot);
    }

    /// Replaces the current text from a remote swap event.
    ///
    /// Remote content came from the server, so it never loops back into a
    /// persistence write.
    pub fn apply_remote(&self, content: impl Into<String>) {
        if let Ok(mut current) = self.current.write() {
            *current = content.into();
        }
    }

    /// Current text snapshot.
    #[must_use]
    pub fn text(&self) -> String {
        self.current.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Shared handle onto the current text, for cross-pane consumers
    /// (attribute indexing reads both markup panes).
    #[must_use]
    pub fn shared_text(&self) -> Arc<RwLock<String>> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<(Pane, String)>>,
    }

    impl PaneWriter for RecordingWriter {
        fn write(&self, pane: Pane, text: String) {
            self.writes.lock().unwrap().push((pane, text));
        }
    }

    fn fast_profile() -> DebounceProfile {
        DebounceProfile {
            delay: Duration::from_millis(100),
            max_buffer: 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_only_last_snapshot() {
        let writer = Arc::new(RecordingWriter::default());
        let controller =
            PaneController::with_profile(Pane::Body, "<p></p>", fast_profile(), writer.clone());

        controller.notify_change("<p>a</p>");
        controller.notify_change("<p>ab</p>");
        controller.notify_change("<p>abc</p>");
        tokio::time::sleep(Duration::from_millis(200)).await;

        let writes = writer.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], (Pane::Body, "<p>abc</p>".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_text_is_written_once() {
        let writer = Arc::new(RecordingWriter::default());
        let controller =
            PaneController::with_profile(Pane::Style, "", fast_profile(), writer.clone());

        controller.notify_change("body { color: red }");
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Second flush window with the same content: no redundant write.
        controller.notify_change("body { color: red }");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(writer.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_initial_text_is_never_written() {
        let writer = Arc::new(RecordingWriter::default());
        let controller =
            PaneController::with_profile(Pane::Head, "<title>x</title>", fast_profile(), writer.clone());

        controller.notify_change("<title>x</title>");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_swap_updates_text_without_writing() {
        let writer = Arc::new(RecordingWriter::default());
        let controller =
            PaneController::with_profile(Pane::Body, "<p>old</p>", fast_profile(), writer.clone());

        controller.apply_remote("<p>from the server</p>");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(controller.text(), "<p>from the server</p>");
        assert!(writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn writes_are_issued_in_flush_order() {
        let writer = Arc::new(RecordingWriter::default());
        let controller =
            PaneController::with_profile(Pane::Script, "", fast_profile(), writer.clone());

        controller.notify_change("const a = 1");
        tokio::time::sleep(Duration::from_millis(200)).await;
        controller.notify_change("const a = 2");
        tokio::time::sleep(Duration::from_millis(200)).await;

        let writes = writer.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, "const a = 1");
        assert_eq!(writes[1].1, "const a = 2");
    }
}
