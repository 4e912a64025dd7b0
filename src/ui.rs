/// file: src/ui.rs
/// description: status banner subscribed to connection and alert events
use crate::{
    alerts::AlertFeed,
    dispatcher::Dispatcher,
    envelope::{AlertPayload, ConnectionStatus, event_type},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::debug;

/// Thin presentation layer: a live/disconnected indicator plus the
/// alert feed pane. Everything else on the dashboard renders from
/// state owned elsewhere.
#[derive(Clone)]
pub struct StatusBanner {
    feed: AlertFeed,
    quiet: bool,
    feed_visible: Arc<AtomicBool>,
}

impl StatusBanner {
    pub fn new(feed: AlertFeed, quiet: bool) -> Self {
        Self {
            feed,
            quiet,
            feed_visible: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe after the feed so alert lines print once the feed
    /// already holds the new entry.
    pub fn attach(&self, dispatcher: &Dispatcher) {
        let banner = self.clone();
        dispatcher.subscribe(event_type::CONNECTION, move |data| {
            let status = ConnectionStatus::from_value(data)?;
            banner.print_connection(&status);
            Ok(())
        });

        for kind in [event_type::ALERT, event_type::RULE_ALERT] {
            let banner = self.clone();
            dispatcher.subscribe(kind, move |data| {
                let payload = AlertPayload::from_value(data)?;
                banner.print_alert(&payload);
                Ok(())
            });
        }
    }

    fn print_connection(&self, status: &ConnectionStatus) {
        if self.quiet {
            return;
        }
        if status.is_connected() {
            println!("[CONNECTED] + live updates streaming");
        } else if status.terminal {
            println!("[OFFLINE] ! reconnect attempts exhausted, live updates stopped");
        } else {
            println!("[DISCONNECTED] x connection lost");
        }
    }

    fn print_alert(&self, payload: &AlertPayload) {
        if !self.quiet {
            println!("[ALERT] ! {}: {}", payload.symbol, payload.message);
        }
        self.refresh_visibility();
    }

    /// The feed pane is shown once the feed becomes non-empty and
    /// hidden again once it drains.
    pub fn refresh_visibility(&self) {
        let visible = self.feed.is_visible();
        let was = self.feed_visible.swap(visible, Ordering::Relaxed);
        if visible != was {
            debug!(visible, "alert feed visibility changed");
        }
    }
}
