//! Legacy one-directional transport adapter.
//!
//! The older server push surface delivers named events `head` and `body`,
//! each carrying full replacement markup. It has no dependency-change
//! signaling. The adapter maps those onto the same swap events the primary
//! channel publishes, so reactors don't care which transport fed them.

use inkpad_types::{LiveEvent, SwapTarget};
use tokio::sync::mpsc;

use crate::channel::LiveSyncChannel;

/// One server-pushed named event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEvent {
    /// Event name (`head` or `body`).
    pub name: String,
    /// Full replacement markup.
    pub data: String,
}

/// Forwards legacy events onto the channel's bus until the feed ends.
pub async fn run_legacy_feed(channel: LiveSyncChannel, mut feed: mpsc::Receiver<LegacyEvent>) {
    while let Some(event) = feed.recv().await {
        match event.name.parse::<SwapTarget>() {
            Ok(target) => channel.publish(LiveEvent::Swap {
                target,
                content: event.data,
            }),
            Err(_) => {
                tracing::trace!(name = %event.name, "ignoring unknown legacy event");
            }
        }
    }
    tracing::debug!("legacy feed ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn named_events_map_to_swaps() {
        let channel = LiveSyncChannel::new();
        let mut events = channel.subscribe();
        let (tx, rx) = mpsc::channel(4);

        tx.send(LegacyEvent {
            name: "head".to_string(),
            data: "<title>x</title>".to_string(),
        })
        .await
        .unwrap();
        tx.send(LegacyEvent {
            name: "body".to_string(),
            data: "<p>hi</p>".to_string(),
        })
        .await
        .unwrap();
        drop(tx);
        run_legacy_feed(channel.clone(), rx).await;

        assert_eq!(
            events.recv().await.unwrap(),
            LiveEvent::Swap {
                target: SwapTarget::Head,
                content: "<title>x</title>".to_string(),
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            LiveEvent::Swap {
                target: SwapTarget::Body,
                content: "<p>hi</p>".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_names_are_skipped() {
        let channel = LiveSyncChannel::new();
        let mut events = channel.subscribe();
        let (tx, rx) = mpsc::channel(4);

        tx.send(LegacyEvent {
            name: "deploy".to_string(),
            data: "x".to_string(),
        })
        .await
        .unwrap();
        drop(tx);
        run_legacy_feed(channel.clone(), rx).await;

        assert!(matches!(
            events.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
