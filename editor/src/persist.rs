//! Persistence client — fire-and-forget pane writes.
//!
//! An update is a single PUT to a pane-specific endpoint carrying the full
//! current document text; no diff encoding, no retry. Write completion is
//! invisible to the editor: a failure leaves the server stale until the next
//! differing edit triggers another write.

use std::time::Duration;

use inkpad_types::Pane;
use thiserror::Error;
use url::Url;

use crate::pane::PaneWriter;

const WRITE_TIMEOUT_SECS: u64 = 10;

/// Failed to construct the persistence client.
#[derive(Debug, Error)]
pub enum PersistError {
    /// HTTP client construction failed.
    #[error("building HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The base URL cannot have pane segments appended.
    #[error("persistence base URL cannot be a base: {0}")]
    BadBase(Url),
}

/// HTTP writer for pane documents.
#[derive(Debug, Clone)]
pub struct PersistClient {
    http: reqwest::Client,
    base: Url,
}

impl PersistClient {
    /// Creates a client writing under `base` (the document's own URL; pane
    /// segments are appended to it).
    pub fn new(base: Url) -> Result<Self, PersistError> {
        if base.cannot_be_a_base() {
            return Err(PersistError::BadBase(base));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WRITE_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, pane: Pane) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(pane.segment());
        }
        url
    }
}

impl PaneWriter for PersistClient {
    fn write(&self, pane: Pane, text: String) {
        let request = self.http.put(self.endpoint(pane)).body(text);
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(%pane, "pane persisted");
                }
                Ok(response) => {
                    tracing::warn!(%pane, status = %response.status(), "pane write rejected");
                }
                Err(e) => {
                    tracing::warn!(%pane, "pane write failed: {e}");
                }
            }
        });
    }
}
