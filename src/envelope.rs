// file: src/envelope.rs
// description: inbound frame decoding into typed {type, data} envelopes

use crate::error::StockStreamError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type strings consumed by the core. Frames carrying any other
/// `type` are still dispatched verbatim to whoever subscribed to that
/// literal string.
pub mod event_type {
    /// Local connection lifecycle status, emitted by the client itself
    /// and never received from the peer.
    pub const CONNECTION: &str = "connection";
    /// Incremental per-symbol price update.
    pub const STOCK_UPDATE: &str = "stock_update";
    /// System-triggered price movement alert.
    pub const ALERT: &str = "alert";
    /// User-rule-triggered alert.
    pub const RULE_ALERT: &str = "rule_alert";
}

/// The `{type, data}` wrapper around every inbound event, used for
/// dispatch routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse a raw text frame into an envelope.
///
/// Malformed input is an error for the caller to log and drop; it must
/// never tear down the channel.
pub fn decode(text: &str) -> Result<Envelope, StockStreamError> {
    serde_json::from_str(text).map_err(|e| StockStreamError::InvalidMessage(e.to_string()))
}

/// Payload of a locally emitted `connection` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: String,
    /// Set on the final status once reconnect attempts are exhausted.
    #[serde(default)]
    pub terminal: bool,
}

impl ConnectionStatus {
    pub const CONNECTED: &'static str = "connected";
    pub const DISCONNECTED: &'static str = "disconnected";

    pub fn from_value(value: &Value) -> Result<Self, StockStreamError> {
        serde_json::from_value(value.clone())
            .map_err(|e| StockStreamError::InvalidMessage(e.to_string()))
    }

    pub fn is_connected(&self) -> bool {
        self.status == Self::CONNECTED
    }
}

/// Partial per-symbol update carried by a `stock_update` envelope.
///
/// Every field except the symbol is optional; absent fields leave the
/// cached view untouched on merge. Fields this core does not model are
/// captured in `extra` and merged through unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockUpdate {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
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

impl StockUpdate {
    pub fn from_value(value: &Value) -> Result<Self, StockStreamError> {
        serde_json::from_value(value.clone())
            .map_err(|e| StockStreamError::InvalidMessage(e.to_string()))
    }
}

/// Payload of an `alert` or `rule_alert` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub symbol: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AlertPayload {
    pub fn from_value(value: &Value) -> Result<Self, StockStreamError> {
        serde_json::from_value(value.clone())
            .map_err(|e| StockStreamError::InvalidMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_typed_envelope() {
        let envelope = decode(r#"{"type":"stock_update","data":{"symbol":"AAPL","price":101.5}}"#)
            .expect("well-formed frame");
        assert_eq!(envelope.kind, event_type::STOCK_UPDATE);
        assert_eq!(envelope.data["symbol"], "AAPL");
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let envelope = decode(r#"{"type":"heartbeat"}"#).expect("data field is optional");
        assert_eq!(envelope.kind, "heartbeat");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            decode("{not json"),
            Err(StockStreamError::InvalidMessage(_))
        ));
        // valid JSON but not an envelope
        assert!(decode(r#"[1,2,3]"#).is_err());
        assert!(decode(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn partial_stock_update_keeps_unknown_fields() {
        let value = json!({
            "symbol": "AAPL",
            "price": 105.0,
            "timestamp": "2026-08-06T12:00:00Z"
        });
        let update = StockUpdate::from_value(&value).expect("valid update");
        assert_eq!(update.price, Some(105.0));
        assert_eq!(update.volume, None);
        assert_eq!(update.extra["timestamp"], "2026-08-06T12:00:00Z");
    }

    #[test]
    fn alert_payload_tolerates_extra_fields() {
        let value = json!({
            "id": 42,
            "user_id": 7,
            "symbol": "TSLA",
            "alert_type": "SUDDEN_DROP",
            "message": "TSLA SUDDEN_DROP: Price changed by -2.4%",
            "is_read": false
        });
        let payload = AlertPayload::from_value(&value).expect("valid alert");
        assert_eq!(payload.symbol, "TSLA");
        assert!(payload.message.contains("SUDDEN_DROP"));
    }
}
