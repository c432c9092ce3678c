use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::StateEvent;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Callback = Arc<dyn Fn(&StateEvent) + Send + Sync>;

/// Handle to a callback receiving [`StateEvent`]s.
///
/// Clones share the same identity, so a clone can be used to remove a
/// listener that was registered earlier.
#[derive(Clone)]
pub struct EventListener {
    id: u64,
    callback: Callback,
}

impl EventListener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        }
    }

    /// A listener forwarding every event to an unbounded channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self::new(move |event: &StateEvent| {
            let _ = tx.send(event.clone());
        });
        (listener, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn notify(&self, event: &StateEvent) {
        (self.callback)(event)
    }
}

impl PartialEq for EventListener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventListener {}

impl Hash for EventListener {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener").field("id", &self.id).finish()
    }
}
