//! Session Surface
//!
//! Holds the single mutable session record shared between the connection
//! manager (the only writer) and consumer handles: the published connection,
//! the connectivity flag, and the accumulated message log.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Snapshot of the currently published connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Resolved base address the channel was opened against
    pub url: String,
    /// When the channel opened
    pub connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct SessionInner {
    connection: Option<ConnectionInfo>,
    outbound: Option<mpsc::Sender<Value>>,
    connected: bool,
    messages: Vec<Value>,
}

/// Consumer-facing handle to the session. Cheap to clone; all clones share
/// the same session record.
#[derive(Clone, Default)]
pub struct ClientHandle {
    inner: Arc<RwLock<SessionInner>>,
}

impl ClientHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published connection, if any
    pub fn connection(&self) -> Option<ConnectionInfo> {
        self.inner.read().connection.clone()
    }

    /// Whether the channel is currently open and usable
    pub fn is_connected(&self) -> bool {
        self.inner.read().connected
    }

    /// Snapshot of all messages received so far, in arrival order.
    ///
    /// The log is append-only and unbounded for the lifetime of the session.
    pub fn messages(&self) -> Vec<Value> {
        self.inner.read().messages.clone()
    }

    /// Number of messages received so far
    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// Send a message over the channel.
    ///
    /// A no-op when the channel is not open: the message is dropped and the
    /// drop is reported to the log surface, not to the caller. The outbound
    /// queue is bounded; if it is full (the manager task has fallen behind),
    /// the message is likewise dropped and logged rather than blocking the
    /// caller.
    pub fn send(&self, message: Value) {
        let sender = {
            let inner = self.inner.read();
            match (&inner.outbound, inner.connected) {
                (Some(tx), true) => tx.clone(),
                _ => {
                    warn!("Channel not connected, dropping outbound message");
                    return;
                }
            }
        };

        if sender.try_send(message).is_err() {
            warn!("Outbound queue unavailable, dropping message");
        }
    }

    /// Publish a newly opened connection and flip the connectivity flag
    pub(crate) fn publish(&self, url: &str, outbound: mpsc::Sender<Value>) {
        let mut inner = self.inner.write();
        inner.connection = Some(ConnectionInfo {
            url: url.to_string(),
            connected_at: Utc::now(),
        });
        inner.outbound = Some(outbound);
        inner.connected = true;
    }

    /// Clear the published connection and flip the connectivity flag.
    /// The message log is retained across reconnections.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.write();
        inner.connection = None;
        inner.outbound = None;
        inner.connected = false;
    }

    /// Append a decoded inbound message to the log
    pub(crate) fn push_message(&self, message: Value) {
        self.inner.write().messages.push(message);
    }
}
