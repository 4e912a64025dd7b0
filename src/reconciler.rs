// file: src/reconciler.rs
// description: merges partial stock_update events into the cached dashboard snapshot

use crate::dispatcher::Dispatcher;
use crate::envelope::{StockUpdate, event_type};
use crate::monitoring;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// One row of the dashboard. Fields this core does not model are kept
/// in `extra` so partial updates never lose them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockView {
    pub symbol: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StockView {
    pub fn new(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            ..Self::default()
        }
    }

    /// Shallow-merge the update's present fields over this view.
    /// Absent fields are preserved unchanged; the row is never
    /// replaced wholesale.
    pub fn apply_update(&mut self, update: &StockUpdate) {
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(change) = update.change {
            self.change = Some(change);
        }
        if let Some(change_percent) = update.change_percent {
            self.change_percent = Some(change_percent);
        }
        if let Some(volume) = update.volume {
            self.volume = Some(volume);
        }
        if let Some(trend) = &update.trend {
            self.trend = Some(trend.clone());
        }
        for (key, value) in &update.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_stocks: usize,
    pub gainers: usize,
    pub losers: usize,
}

/// Full dashboard state as fetched from the REST layer, keyed by
/// symbol. This core never creates it, only merges updates into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub stocks: HashMap<String, StockView>,
    pub summary: DashboardSummary,
}

impl DashboardSnapshot {
    pub fn from_stocks(stocks: Vec<StockView>) -> Self {
        let mut snapshot = Self {
            stocks: stocks
                .into_iter()
                .map(|view| (view.symbol.clone(), view))
                .collect(),
            summary: DashboardSummary::default(),
        };
        snapshot.recompute_summary();
        snapshot
    }

    pub fn recompute_summary(&mut self) {
        self.summary = DashboardSummary {
            total_stocks: self.stocks.len(),
            gainers: self
                .stocks
                .values()
                .filter(|view| view.change_percent.unwrap_or(0.0) > 0.0)
                .count(),
            losers: self
                .stocks
                .values()
                .filter(|view| view.change_percent.unwrap_or(0.0) < 0.0)
                .count(),
        };
    }
}

#[derive(Default)]
struct ReconcilerInner {
    snapshot: Option<DashboardSnapshot>,
    dropped_updates: u64,
}

/// Cheaply cloneable handle applying incremental `stock_update`
/// events to the snapshot.
///
/// Updates for symbols missing from the snapshot are dropped, not
/// inserted; a symbol watchlisted after the initial load shows live
/// prices only after the snapshot is refetched. Updates arriving
/// before any snapshot is loaded are dropped as well.
#[derive(Clone, Default)]
pub struct LiveViewReconciler {
    inner: Arc<Mutex<ReconcilerInner>>,
}

impl LiveViewReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReconcilerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe the reconciler to `stock_update` envelopes.
    pub fn attach(&self, dispatcher: &Dispatcher) {
        let reconciler = self.clone();
        dispatcher.subscribe(event_type::STOCK_UPDATE, move |data| {
            let update = StockUpdate::from_value(data)?;
            reconciler.apply(&update);
            Ok(())
        });
    }

    pub fn load_snapshot(&self, snapshot: DashboardSnapshot) {
        self.lock().snapshot = Some(snapshot);
    }

    /// Merge one update. Returns false when it was dropped (no
    /// snapshot yet, or unknown symbol).
    pub fn apply(&self, update: &StockUpdate) -> bool {
        let mut inner = self.lock();
        let Some(snapshot) = inner.snapshot.as_mut() else {
            inner.dropped_updates += 1;
            debug!(symbol = %update.symbol, "update before snapshot load, dropped");
            return false;
        };
        let Some(view) = snapshot.stocks.get_mut(&update.symbol) else {
            inner.dropped_updates += 1;
            debug!(symbol = %update.symbol, "update for unknown symbol, dropped");
            return false;
        };

        view.apply_update(update);
        snapshot.recompute_summary();
        monitoring::STOCK_UPDATE_COUNTER.increment(1);
        true
    }

    pub fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn dropped_updates(&self) -> u64 {
        self.lock().dropped_updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded_reconciler() -> LiveViewReconciler {
        let reconciler = LiveViewReconciler::new();
        let mut aapl = StockView::new("AAPL", 100.0);
        aapl.volume = Some(1000);
        reconciler.load_snapshot(DashboardSnapshot::from_stocks(vec![aapl]));
        reconciler
    }

    #[test]
    fn merge_preserves_unspecified_fields() {
        let reconciler = loaded_reconciler();
        let update = StockUpdate {
            symbol: "AAPL".to_string(),
            price: Some(105.0),
            ..StockUpdate::default()
        };

        assert!(reconciler.apply(&update));
        let snapshot = reconciler.snapshot().expect("snapshot loaded");
        let view = &snapshot.stocks["AAPL"];
        assert_eq!(view.price, 105.0);
        assert_eq!(view.volume, Some(1000));
    }

    #[test]
    fn unknown_symbol_is_dropped_without_insertion() {
        let reconciler = loaded_reconciler();
        let update = StockUpdate {
            symbol: "ZZZZ".to_string(),
            price: Some(50.0),
            ..StockUpdate::default()
        };

        assert!(!reconciler.apply(&update));
        let snapshot = reconciler.snapshot().expect("snapshot loaded");
        assert!(!snapshot.stocks.contains_key("ZZZZ"));
        assert_eq!(snapshot.stocks["AAPL"].price, 100.0);
        assert_eq!(reconciler.dropped_updates(), 1);
    }

    #[test]
    fn updates_before_snapshot_load_are_dropped() {
        let reconciler = LiveViewReconciler::new();
        let update = StockUpdate {
            symbol: "AAPL".to_string(),
            price: Some(105.0),
            ..StockUpdate::default()
        };

        assert!(!reconciler.apply(&update));
        assert!(reconciler.snapshot().is_none());
        assert_eq!(reconciler.dropped_updates(), 1);
    }

    #[test]
    fn unknown_fields_merge_through_unchanged() {
        let reconciler = loaded_reconciler();
        let update = StockUpdate::from_value(&json!({
            "symbol": "AAPL",
            "trend": "UP",
            "timestamp": "2026-08-06T12:00:00Z"
        }))
        .expect("valid update");

        assert!(reconciler.apply(&update));
        let snapshot = reconciler.snapshot().expect("snapshot loaded");
        let view = &snapshot.stocks["AAPL"];
        assert_eq!(view.trend.as_deref(), Some("UP"));
        assert_eq!(view.extra["timestamp"], "2026-08-06T12:00:00Z");
        assert_eq!(view.price, 100.0);
    }

    #[test]
    fn summary_tracks_gainers_and_losers() {
        let reconciler = LiveViewReconciler::new();
        reconciler.load_snapshot(DashboardSnapshot::from_stocks(vec![
            StockView::new("AAPL", 100.0),
            StockView::new("TSLA", 200.0),
        ]));

        reconciler.apply(&StockUpdate {
            symbol: "AAPL".to_string(),
            change_percent: Some(1.2),
            ..StockUpdate::default()
        });
        reconciler.apply(&StockUpdate {
            symbol: "TSLA".to_string(),
            change_percent: Some(-0.8),
            ..StockUpdate::default()
        });

        let summary = reconciler.snapshot().expect("snapshot loaded").summary;
        assert_eq!(summary.total_stocks, 2);
        assert_eq!(summary.gainers, 1);
        assert_eq!(summary.losers, 1);
    }

    #[test]
    fn dispatched_updates_reach_the_snapshot() {
        let dispatcher = Dispatcher::new();
        let reconciler = loaded_reconciler();
        reconciler.attach(&dispatcher);

        dispatcher.dispatch(
            event_type::STOCK_UPDATE,
            &json!({"symbol": "AAPL", "price": 107.25, "trend": "UP"}),
        );

        let snapshot = reconciler.snapshot().expect("snapshot loaded");
        assert_eq!(snapshot.stocks["AAPL"].price, 107.25);
    }
}
