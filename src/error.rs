use thiserror::Error;

#[derive(Error, Debug)]
pub enum StockStreamError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Channel is not connected")]
    NotConnected,

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}
