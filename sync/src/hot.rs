//! Hot swap of rendered document regions.
//!
//! A swap replaces a region's markup wholesale. Script elements that arrive
//! inside swapped markup are inert (markup-parsed scripts do not execute),
//! so elements marked reinjectable are rebuilt with identical attributes
//! and text and handed to a [`ScriptRunner`] exactly once each. Actual
//! execution is the embedder's concern; the runner is the observable
//! side-effect seam.

use std::sync::Arc;

use inkpad_types::SwapTarget;
use scraper::{Html, Selector};

/// Marker attribute on scripts that must re-execute after a swap.
const REINJECT_SELECTOR: &str = r#"script[data-from="hot"]"#;

/// A script element reconstructed from swapped markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedScript {
    /// Attributes in document order, as they appeared on the original
    /// element.
    pub attributes: Vec<(String, String)>,
    /// The element's text content, verbatim.
    pub text: String,
}

/// Receives each reinjectable script exactly once per swap that delivered
/// it.
pub trait ScriptRunner: Send + Sync {
    /// Runs one reconstructed script.
    fn run(&self, script: &InjectedScript);
}

/// The rendered preview's head and body markup, kept current by swaps.
pub struct PreviewDocument {
    head: String,
    body: String,
    runner: Arc<dyn ScriptRunner>,
}

impl PreviewDocument {
    /// An empty document wired to `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            head: String::new(),
            body: String::new(),
            runner,
        }
    }

    /// Replaces `target`'s markup and reinjects marked scripts.
    pub fn apply_swap(&mut self, target: SwapTarget, content: &str) {
        let scripts = reinjectable_scripts(content);
        match target {
            SwapTarget::Head => self.head = content.to_string(),
            SwapTarget::Body => self.body = content.to_string(),
        }
        if !scripts.is_empty() {
            tracing::debug!(target = %target.as_str(), count = scripts.len(), "reinjecting scripts");
        }
        for script in &scripts {
            self.runner.run(script);
        }
    }

    /// Current head markup.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Current body markup.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Reconstructs the reinjectable scripts contained in `markup`, in document
/// order.
#[must_use]
pub fn reinjectable_scripts(markup: &str) -> Vec<InjectedScript> {
    let selector = Selector::parse(REINJECT_SELECTOR).expect("reinject selector");
    let fragment = Html::parse_fragment(markup);

    fragment
        .select(&selector)
        .map(|element| InjectedScript {
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: element.text().collect(),
        })
        .collect()
}
