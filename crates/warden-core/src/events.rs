//! Progress events for long-running session operations.
//!
//! The orchestrator and transfer layer emit structured events so a UI can
//! show what the host is doing (downloading a world, waiting on a backup).
//! The sink is optional: a disabled sink makes every send a no-op, and a
//! dropped receiver is tolerated the same way. Sends never block and never
//! fail.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A structured progress event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Event {
    /// An operation began.
    Started {
        /// Name of the operation (e.g. `pull_world`).
        operation: String,
    },
    /// An operation made progress.
    Progress {
        /// Name of the operation.
        operation: String,
        /// Free-form progress detail (current file, bytes moved).
        detail: String,
    },
    /// An operation completed.
    Finished {
        /// Name of the operation.
        operation: String,
    },
    /// The host needs operator attention before continuing.
    Prompt {
        /// Message shown to the operator.
        message: String,
    },
}

/// One-way channel of [`Event`]s; absence of a consumer is tolerated.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    /// Creates a sink plus the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Creates a sink that discards every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sends an event. No-op when disabled or when the receiver is gone.
    pub fn send(&self, event: Event) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Convenience: sends [`Event::Started`].
    pub fn started(&self, operation: impl Into<String>) {
        self.send(Event::Started {
            operation: operation.into(),
        });
    }

    /// Convenience: sends [`Event::Progress`].
    pub fn progress(&self, operation: impl Into<String>, detail: impl Into<String>) {
        self.send(Event::Progress {
            operation: operation.into(),
            detail: detail.into(),
        });
    }

    /// Convenience: sends [`Event::Finished`].
    pub fn finished(&self, operation: impl Into<String>) {
        self.send(Event::Finished {
            operation: operation.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.started("pull_world");
        sink.progress("pull_world", "worlds/a.tar.gz");
        sink.finished("pull_world");

        assert_eq!(
            rx.recv().await,
            Some(Event::Started {
                operation: "pull_world".into()
            })
        );
        assert!(matches!(rx.recv().await, Some(Event::Progress { .. })));
        assert!(matches!(rx.recv().await, Some(Event::Finished { .. })));
    }

    #[tokio::test]
    async fn test_disabled_sink_is_noop() {
        let sink = EventSink::disabled();
        sink.started("anything");
        sink.send(Event::Prompt {
            message: "ignored".into(),
        });
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_tolerated() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.finished("late");
    }
}
