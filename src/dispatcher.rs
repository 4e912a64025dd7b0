// file: src/dispatcher.rs
// description: subscription registry and synchronous, fault-isolated event fan-out

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Subscriber callback. Errors are logged and isolated inside
/// `dispatch`; they never abort the fan-out.
pub type Handler = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Token returned by `subscribe`, used for exact removal of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    handler: Handler,
}

/// Maps event type to an ordered list of subscriber callbacks.
///
/// Shared behind `Arc` between the client, its consumers, and timers.
/// The lock is never held while a handler runs, so handlers may
/// subscribe or unsubscribe reentrantly without corrupting an
/// in-flight fan-out.
#[derive(Default)]
pub struct Dispatcher {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<Entry>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `handler` to the list for `event_type`.
    ///
    /// Subscribing the same closure twice produces two entries and two
    /// invocations per dispatch. That pass-through is intentional, not
    /// deduplicated.
    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().entry(event_type.to_string()).or_default().push(Entry {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove the entry registered under `id` for `event_type`.
    /// Returns false when no such entry exists; absence is a no-op,
    /// never an error.
    pub fn unsubscribe(&self, event_type: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(event_type) else {
            return false;
        };
        let Some(position) = list.iter().position(|entry| entry.id == id) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            handlers.remove(event_type);
        }
        true
    }

    /// Invoke every handler currently subscribed for `event_type`, in
    /// subscription order, against a stable snapshot of the list taken
    /// at dispatch start. Returns the number of handlers invoked.
    pub fn dispatch(&self, event_type: &str, data: &Value) -> usize {
        let snapshot: Vec<(SubscriptionId, Handler)> = {
            let handlers = self.lock();
            match handlers.get(event_type) {
                Some(list) => list
                    .iter()
                    .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                    .collect(),
                None => return 0,
            }
        };

        let mut invoked = 0;
        for (id, handler) in snapshot {
            if let Err(e) = handler(data) {
                warn!(event_type, subscription = id.0, "subscriber failed: {e:#}");
            }
            invoked += 1;
        }
        invoked
    }

    /// Number of live subscriptions for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.lock().get(event_type).map_or(0, Vec::len)
    }

    /// Remove every subscription. Used by connection teardown so no
    /// further dispatch reaches removed subscribers.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
