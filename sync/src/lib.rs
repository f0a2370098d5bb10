//! Live synchronization between the server and the rendered preview.
//!
//! A persistent transport delivers text messages that demultiplex into two
//! event kinds: region swaps and dependency changes. The channel publishes
//! them on a typed broadcast bus owned by the page session; independent
//! reactors subscribe and respond. Live sync is a convenience layer over
//! live authoring, not a durability guarantee — a failed channel closes for
//! good and editing continues without it.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`protocol`] | Space-delimited wire format → [`inkpad_types::LiveEvent`] |
//! | [`channel`] | Transport consumption, state machine, broadcast bus |
//! | [`legacy`] | Older named-event push transport mapped onto swaps |
//! | [`hot`] | Region swap application with script reinjection |
//! | [`reactor`] | Page and language consumers of dependency changes |

pub mod channel;
pub mod hot;
pub mod legacy;
pub mod protocol;
pub mod reactor;

pub use channel::{ChannelState, LiveSyncChannel, TransportEvent};
pub use hot::{InjectedScript, PreviewDocument, ScriptRunner};
pub use legacy::{run_legacy_feed, LegacyEvent};
pub use protocol::{parse_message, ProtocolError};
pub use reactor::{run_language_reactor, run_page_reactor, LangCommand, PageCommand};
