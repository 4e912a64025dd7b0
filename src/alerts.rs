// file: src/alerts.rs
// description: bounded, self-expiring notification feed consumed by the status banner

use crate::dispatcher::Dispatcher;
use crate::envelope::{AlertPayload, event_type};
use crate::monitoring;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub symbol: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct FeedInner {
    /// Newest first.
    alerts: Vec<Alert>,
    /// One cancellable expiry task per live alert, keyed by alert id.
    expiry_tasks: HashMap<Uuid, JoinHandle<()>>,
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        for (_, task) in self.expiry_tasks.drain() {
            task.abort();
        }
    }
}

/// Cheaply cloneable handle to the notification feed.
///
/// Holds at most `retention` alerts at a time; every alert is removed
/// after `ttl` unless dismissed first. Expiry and dismissal are both
/// idempotent, so a timer firing after a manual dismiss is a no-op.
#[derive(Clone)]
pub struct AlertFeed {
    retention: usize,
    ttl: Duration,
    inner: Arc<Mutex<FeedInner>>,
}

impl AlertFeed {
    pub fn new(retention: usize, ttl: Duration) -> Self {
        Self {
            retention,
            ttl,
            inner: Arc::new(Mutex::new(FeedInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe the feed to alert-class envelopes.
    pub fn attach(&self, dispatcher: &Dispatcher) {
        for kind in [event_type::ALERT, event_type::RULE_ALERT] {
            let feed = self.clone();
            dispatcher.subscribe(kind, move |data| {
                let payload = AlertPayload::from_value(data)?;
                feed.raise(&payload.symbol, &payload.message);
                Ok(())
            });
        }
    }

    /// Prepend a fresh alert, evict beyond the retention cap, and
    /// schedule its expiry. Returns the new alert's id.
    pub fn raise(&self, symbol: &str, message: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let alert = Alert {
            id,
            symbol: symbol.to_string(),
            message: message.to_string(),
            timestamp: now,
            expires_at: now + chrono::Duration::milliseconds(self.ttl.as_millis() as i64),
        };

        let mut inner = self.lock();
        inner.alerts.insert(0, alert);
        while inner.alerts.len() > self.retention {
            if let Some(evicted) = inner.alerts.pop()
                && let Some(task) = inner.expiry_tasks.remove(&evicted.id)
            {
                task.abort();
            }
        }

        let expiry = tokio::spawn({
            let inner = Arc::clone(&self.inner);
            let ttl = self.ttl;
            async move {
                tokio::time::sleep(ttl).await;
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.alerts.retain(|alert| alert.id != id);
                inner.expiry_tasks.remove(&id);
                if inner.alerts.is_empty() {
                    debug!("alert feed drained");
                }
            }
        });
        inner.expiry_tasks.insert(id, expiry);

        monitoring::ALERT_COUNTER.increment(1);
        id
    }

    /// Remove an alert immediately regardless of its timer state.
    /// Returns false when the alert was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut inner = self.lock();
        let before = inner.alerts.len();
        inner.alerts.retain(|alert| alert.id != id);
        if let Some(task) = inner.expiry_tasks.remove(&id) {
            task.abort();
        }
        inner.alerts.len() != before
    }

    /// Current feed contents, newest first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().alerts.is_empty()
    }

    /// The banner shows the feed once it becomes non-empty and hides
    /// it again once it drains.
    pub fn is_visible(&self) -> bool {
        !self.is_empty()
    }

    /// Cancel every outstanding expiry task and drop all alerts, so no
    /// timer ever fires against torn-down state.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        for (_, task) in inner.expiry_tasks.drain() {
            task.abort();
        }
        inner.alerts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_millis(10_000);

    /// Let spawned expiry tasks register their timers / observe fires.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_only_the_five_most_recent_alerts() {
        let feed = AlertFeed::new(5, TTL);
        for n in 1..=7 {
            feed.raise(&format!("SYM{n}"), "moved");
        }

        let alerts = feed.alerts();
        assert_eq!(alerts.len(), 5);
        assert_eq!(alerts[0].symbol, "SYM7");
        assert_eq!(alerts[4].symbol, "SYM3");
        assert!(!alerts.iter().any(|a| a.symbol == "SYM1" || a.symbol == "SYM2"));
    }

    #[tokio::test(start_paused = true)]
    async fn alert_expires_at_its_ttl_boundary() {
        let feed = AlertFeed::new(5, TTL);
        feed.raise("AAPL", "sudden rise");
        settle().await;

        advance(Duration::from_millis(9_999)).await;
        settle().await;
        assert_eq!(feed.len(), 1);

        advance(Duration::from_millis(2)).await;
        settle().await;
        assert!(feed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_is_immediate_and_the_late_timer_is_a_noop() {
        let feed = AlertFeed::new(5, TTL);
        let id = feed.raise("TSLA", "sudden drop");
        settle().await;

        assert!(feed.dismiss(id));
        assert!(feed.is_empty());
        assert!(!feed.dismiss(id));

        advance(TTL + Duration::from_millis(1)).await;
        settle().await;
        assert!(feed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_follows_feed_contents() {
        let feed = AlertFeed::new(5, TTL);
        assert!(!feed.is_visible());

        let id = feed.raise("MSFT", "threshold crossed");
        assert!(feed.is_visible());

        feed.dismiss(id);
        assert!(!feed.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_cancels_the_evicted_alerts_timer() {
        let feed = AlertFeed::new(1, TTL);
        feed.raise("OLD", "first");
        settle().await;
        feed.raise("NEW", "second");
        settle().await;

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.alerts()[0].symbol, "NEW");

        advance(TTL + Duration::from_millis(1)).await;
        settle().await;
        assert!(feed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn attached_feed_consumes_alert_class_envelopes() {
        let dispatcher = Dispatcher::new();
        let feed = AlertFeed::new(5, TTL);
        feed.attach(&dispatcher);

        dispatcher.dispatch(
            event_type::ALERT,
            &json!({"symbol": "AAPL", "message": "AAPL SUDDEN_RISE: Price changed by 2.1%"}),
        );
        dispatcher.dispatch(
            event_type::RULE_ALERT,
            &json!({"symbol": "TSLA", "message": "TSLA triggered PRICE_ABOVE rule"}),
        );
        // malformed alert payload is isolated by the dispatcher
        dispatcher.dispatch(event_type::ALERT, &json!({"symbol": "NOPE"}));

        let alerts = feed.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].symbol, "TSLA");
        assert_eq!(alerts[1].symbol, "AAPL");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_outstanding_timers() {
        let feed = AlertFeed::new(5, TTL);
        feed.raise("AAPL", "one");
        feed.raise("TSLA", "two");
        settle().await;

        feed.shutdown();
        assert!(feed.is_empty());

        advance(TTL + Duration::from_millis(1)).await;
        settle().await;
        assert!(feed.is_empty());
    }
}
