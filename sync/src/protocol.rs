//! Live sync wire format.
//!
//! Text messages, space-delimited, first token names the kind:
//!
//! ```text
//! swap <head|body> <content...>
//! dep <add|remove> <packageName>
//! ```
//!
//! Swap content is the remainder of the message verbatim and may itself
//! contain spaces. The dep package name is a single token.

use inkpad_types::{LiveEvent, UnknownToken};
use thiserror::Error;

/// A message that doesn't parse into a [`LiveEvent`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Empty message.
    #[error("empty live sync message")]
    Empty,
    /// First token isn't a known message kind.
    #[error("unknown live sync message kind: {0:?}")]
    UnknownKind(String),
    /// The kind token arrived without its required arguments.
    #[error("live sync {kind} message missing its {field}")]
    MissingField {
        /// Message kind.
        kind: &'static str,
        /// Which argument was absent.
        field: &'static str,
    },
    /// An argument token that doesn't name a known variant.
    #[error(transparent)]
    BadToken(#[from] UnknownToken),
}

/// Parses one inbound message into a typed event.
pub fn parse_message(message: &str) -> Result<LiveEvent, ProtocolError> {
    let mut parts = message.splitn(3, ' ');
    let kind = parts.next().filter(|k| !k.is_empty()).ok_or(ProtocolError::Empty)?;

    match kind {
        "swap" => {
            let target = parts
                .next()
                .ok_or(ProtocolError::MissingField {
                    kind: "swap",
                    field: "target",
                })?
                .parse()?;
            // Everything after the target is content, verbatim. A swap with
            // no third part clears the region.
            let content = parts.next().unwrap_or("").to_string();
            Ok(LiveEvent::Swap { target, content })
        }
        "dep" => {
            let mut args = message.split_whitespace().skip(1);
            let change = args
                .next()
                .ok_or(ProtocolError::MissingField {
                    kind: "dep",
                    field: "change",
                })?
                .parse()?;
            let package = args
                .next()
                .ok_or(ProtocolError::MissingField {
                    kind: "dep",
                    field: "package",
                })?
                .to_string();
            Ok(LiveEvent::Dep { change, package })
        }
        other => Err(ProtocolError::UnknownKind(other.to_string())),
    }
}
