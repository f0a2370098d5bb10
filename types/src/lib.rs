//! Core domain types for Inkpad.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Panes
// ============================================================================

/// One of the four independently edited document regions.
///
/// The set is closed on purpose: pane-dependent behavior is expressed as
/// exhaustive matches so a new pane kind is a compile-time-checked addition,
/// not a stringly-typed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    /// Markup head fragment.
    Head,
    /// Markup body fragment.
    Body,
    /// Stylesheet.
    Style,
    /// Script.
    Script,
}

impl Pane {
    /// All panes, in document order.
    pub const ALL: [Pane; 4] = [Pane::Head, Pane::Body, Pane::Style, Pane::Script];

    /// Path segment used by the persistence endpoint for this pane.
    ///
    /// The server keys documents by the legacy short names (`css`/`js`),
    /// not the pane names.
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Pane::Head => "head",
            Pane::Body => "body",
            Pane::Style => "css",
            Pane::Script => "js",
        }
    }

    /// Whether this pane carries markup that feeds the attribute indexer.
    #[must_use]
    pub fn is_markup(self) -> bool {
        matches!(self, Pane::Head | Pane::Body)
    }

    /// Default coalescing profile for this pane.
    ///
    /// Script is a lot more costly to evaluate downstream and doesn't really
    /// have a stable intermediate state, so its window and ceiling are much
    /// larger than the markup/style panes'.
    #[must_use]
    pub fn debounce_profile(self) -> DebounceProfile {
        match self {
            Pane::Head | Pane::Body | Pane::Style => DebounceProfile {
                delay: Duration::from_millis(200),
                max_buffer: 4,
            },
            Pane::Script => DebounceProfile {
                delay: Duration::from_millis(1000),
                max_buffer: 1000,
            },
        }
    }
}

impl std::fmt::Display for Pane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

/// Coalescing parameters for one pane's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceProfile {
    /// Quiet period before a flush.
    #[serde(with = "millis")]
    pub delay: Duration,
    /// Buffered update count above which a flush is forced.
    pub max_buffer: usize,
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// ============================================================================
// Live sync events
// ============================================================================

/// Document region addressed by a swap event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapTarget {
    /// Replace the rendered head.
    Head,
    /// Replace the rendered body.
    Body,
}

impl SwapTarget {
    /// Wire token for this target.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SwapTarget::Head => "head",
            SwapTarget::Body => "body",
        }
    }

    /// The pane whose last-persisted state a swap of this target reflects.
    #[must_use]
    pub fn pane(self) -> Pane {
        match self {
            SwapTarget::Head => Pane::Head,
            SwapTarget::Body => Pane::Body,
        }
    }
}

impl std::str::FromStr for SwapTarget {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(SwapTarget::Head),
            "body" => Ok(SwapTarget::Body),
            other => Err(UnknownToken::new("swap target", other)),
        }
    }
}

/// Direction of a dependency change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepChange {
    /// A package was added to the page's dependency set.
    Add,
    /// A package was removed.
    Remove,
}

impl std::str::FromStr for DepChange {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(DepChange::Add),
            "remove" => Ok(DepChange::Remove),
            other => Err(UnknownToken::new("dep change", other)),
        }
    }
}

/// Typed event demultiplexed off the live sync channel.
///
/// Consumed transiently; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Replace a document region's rendered content.
    Swap {
        /// Which region to replace.
        target: SwapTarget,
        /// Replacement markup, verbatim (may contain spaces).
        content: String,
    },
    /// A page dependency was added or removed.
    Dep {
        /// Direction of the change.
        change: DepChange,
        /// Single-token package name.
        package: String,
    },
}

/// A wire token that doesn't name a known variant.
#[derive(Debug, Error)]
#[error("unknown {kind} token: {token:?}")]
pub struct UnknownToken {
    kind: &'static str,
    token: String,
}

impl UnknownToken {
    fn new(kind: &'static str, token: &str) -> Self {
        Self {
            kind,
            token: token.to_string(),
        }
    }
}
