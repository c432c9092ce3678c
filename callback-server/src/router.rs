//! Event routing for HTTP callback notifications.
//!
//! The `EventRouter` hands every notification received by the server to a
//! channel. Matching a subscription ID to its owner is left to the receiver,
//! which knows the live subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// Raw UPnP event notification received via HTTP callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// The subscription ID from the SID header
    pub subscription_id: String,
    /// The raw XML event body
    pub event_xml: String,
}

/// Forwards notifications from HTTP callbacks to a channel.
#[derive(Debug, Clone)]
pub struct EventRouter {
    event_sender: mpsc::UnboundedSender<NotificationPayload>,
    forwarded: Arc<AtomicU64>,
}

impl EventRouter {
    /// Create a new event router.
    ///
    /// # Example
    ///
    /// ```
    /// use tokio::sync::mpsc;
    /// use callback_server::router::{EventRouter, NotificationPayload};
    ///
    /// let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    /// let router = EventRouter::new(tx);
    /// ```
    pub fn new(event_sender: mpsc::UnboundedSender<NotificationPayload>) -> Self {
        Self {
            event_sender,
            forwarded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Forward an incoming event to the channel.
    ///
    /// Returns `false` if the receiving side has gone away.
    ///
    /// # Example
    ///
    /// ```
    /// # use tokio::sync::mpsc;
    /// # use callback_server::router::{EventRouter, NotificationPayload};
    /// # let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    /// # let router = EventRouter::new(tx);
    /// let routed = router.route_event(
    ///     "uuid:subscription-123".to_string(),
    ///     "<event>data</event>".to_string(),
    /// );
    /// assert!(routed);
    /// ```
    pub fn route_event(&self, subscription_id: String, event_xml: String) -> bool {
        debug!(sid = %subscription_id, bytes = event_xml.len(), "Forwarding notification");

        let payload = NotificationPayload {
            subscription_id,
            event_xml,
        };
        if self.event_sender.send(payload).is_err() {
            return false;
        }
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Number of notifications forwarded so far.
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}
