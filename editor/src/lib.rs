//! Pane controllers and the debounced persistence pipeline.
//!
//! Every keystroke in a pane produces a full document snapshot. This crate
//! turns that firehose into coalesced, ordered, backpressure-aware writes:
//!
//! 1. [`Coalescer`] buffers snapshots and flushes after a quiet period, or
//!    immediately once the buffer hits its ceiling.
//! 2. [`PaneController`] keeps the last-persisted text per pane and skips
//!    writes whose content didn't change.
//! 3. [`PersistClient`] issues the actual fire-and-forget HTTP writes.
//!
//! The attribute indexer ([`attrs`]) and the ambient-typing generator
//! ([`ambient`]) also live here: they are fed from the markup panes' current
//! text and produce the synthetic declaration file consumed by the language
//! worker.

mod ambient;
mod attrs;
mod coalesce;
mod pane;
mod persist;

pub use ambient::{AMBIENT_TYPES_PATH, document_ambient_types};
pub use attrs::{AttributeScanner, RegexScanner};
pub use coalesce::Coalescer;
pub use pane::{PaneController, PaneWriter};
pub use persist::{PersistClient, PersistError};
