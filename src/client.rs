// file: src/client.rs
// description: WebSocket push-channel client for the dashboard gateway

use crate::{
    client_state::{ChannelState, ClientState, SharedClientState},
    config::Config,
    dispatcher::Dispatcher,
    envelope::{self, ConnectionStatus, event_type},
    error::StockStreamError,
    monitoring,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

/// Owns the one persistent channel: lifecycle state machine,
/// bounded-retry reconnection, and fan-out of decoded envelopes
/// through the dispatcher.
///
/// Explicitly constructed and independently instantiable; nothing here
/// is process-wide.
pub struct StockStreamClient {
    pub config: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
    pub state: SharedClientState,
    write: Arc<Mutex<Option<WsSink>>>,
    shutdown: watch::Sender<bool>,
}

impl StockStreamClient {
    pub fn new(config: Arc<Config>, dispatcher: Arc<Dispatcher>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            dispatcher,
            state: Arc::new(Mutex::new(ClientState::new())),
            write: Arc::new(Mutex::new(None)),
            shutdown,
        }
    }

    /// Drive the channel until a caller-initiated `disconnect()` or
    /// until the reconnect cap is exhausted. Connection failures are
    /// absorbed by the reconnect policy and never surface as errors.
    pub async fn run(&self) -> Result<(), StockStreamError> {
        self.shutdown.send_replace(false);

        loop {
            match self.connect_and_stream().await {
                // caller-initiated teardown
                Ok(true) => return Ok(()),
                // peer close or stream end
                Ok(false) => info!("channel closed by peer"),
                Err(e) => warn!("connection error: {e}"),
            }

            self.on_channel_down().await;
            if !self.schedule_reconnect().await {
                return Ok(());
            }
        }
    }

    /// One connection lifetime: open, announce, stream frames.
    /// Returns Ok(true) when ended by the shutdown signal.
    async fn connect_and_stream(&self) -> Result<bool, StockStreamError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Ok(true);
        }

        {
            let mut state = self.state.lock().await;
            state.mark_connecting();
        }
        info!(url = %self.config.websocket.url, "opening channel");

        let (ws_stream, _) = tokio::select! {
            _ = shutdown.changed() => return Ok(true),
            connected = connect_async(self.config.websocket.url.as_str()) => {
                connected.map_err(|e| {
                    error!("failed to open channel: {e}");
                    StockStreamError::WebSocketError(e)
                })?
            }
        };

        let (write, mut read) = ws_stream.split();
        *self.write.lock().await = Some(write);
        {
            let mut state = self.state.lock().await;
            state.mark_connected();
            info!(connection_id = %state.connection_id, "channel established");
        }
        monitoring::CONNECTED_GAUGE.set(1.0);
        self.dispatch_status(ConnectionStatus::CONNECTED, false);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if let Some(mut write) = self.write.lock().await.take() {
                        let _ = write.send(Message::Close(None)).await;
                    }
                    return Ok(true);
                }
                message = read.next() => match message {
                    Some(Ok(message)) => self.handle_frame(message).await?,
                    Some(Err(e)) => return Err(StockStreamError::WebSocketError(e)),
                    None => return Ok(false),
                },
            }
        }
    }

    async fn handle_frame(&self, message: Message) -> Result<(), StockStreamError> {
        match message {
            Message::Text(text) => {
                trace!("received text frame: {text}");
                {
                    let mut state = self.state.lock().await;
                    state.record_message();
                }
                monitoring::MESSAGES_RECEIVED_COUNTER.increment(1);

                match envelope::decode(&text) {
                    Ok(envelope) => {
                        self.dispatcher.dispatch(&envelope.kind, &envelope.data);
                    }
                    // decode failures never close the channel
                    Err(e) => {
                        warn!(
                            "dropping malformed frame: {e}. Frame: {}",
                            text.chars().take(100).collect::<String>()
                        );
                        let mut state = self.state.lock().await;
                        state.record_decode_failure();
                        monitoring::DECODE_FAILURE_COUNTER.increment(1);
                    }
                }
            }
            Message::Binary(data) => {
                debug!("ignoring binary frame of {} bytes", data.len());
            }
            Message::Ping(_) => {
                debug!("received ping");
            }
            Message::Pong(_) => {
                debug!("received pong");
            }
            Message::Close(frame) => {
                warn!("received close frame: {frame:?}");
                return Err(StockStreamError::ConnectionClosed);
            }
            Message::Frame(_) => {
                debug!("received raw frame");
            }
        }
        Ok(())
    }

    async fn on_channel_down(&self) {
        *self.write.lock().await = None;
        {
            let mut state = self.state.lock().await;
            state.mark_disconnected();
        }
        monitoring::CONNECTED_GAUGE.set(0.0);
        self.dispatch_status(ConnectionStatus::DISCONNECTED, false);
    }

    /// Reconnect policy: bounded retries, then a terminal status.
    /// Returns false once retries are exhausted or shutdown was
    /// requested while waiting.
    async fn schedule_reconnect(&self) -> bool {
        let attempt = {
            let mut state = self.state.lock().await;
            state.reconnect_attempts += 1;
            state.reconnect_attempts
        };
        let max = self.config.websocket.max_reconnects;
        if attempt > max {
            error!("maximum reconnection attempts ({max}) reached");
            self.dispatch_status(ConnectionStatus::DISCONNECTED, true);
            return false;
        }

        let delay = self.config.websocket.delay_for_attempt(attempt);
        warn!("reconnecting in {delay:?} (attempt {attempt}/{max})");
        monitoring::RECONNECT_COUNTER.increment(1);

        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return false;
        }
        tokio::select! {
            _ = sleep(delay) => true,
            _ = shutdown.changed() => false,
        }
    }

    /// Transmit `payload` serialized verbatim as one text frame.
    /// Rejected while not connected; nothing is queued or retried.
    pub async fn send(&self, payload: &Value) -> Result<(), StockStreamError> {
        {
            let state = self.state.lock().await;
            if !state.is_connected() {
                return Err(StockStreamError::NotConnected);
            }
        }
        let mut guard = self.write.lock().await;
        let Some(write) = guard.as_mut() else {
            return Err(StockStreamError::NotConnected);
        };
        let text = serde_json::to_string(payload)?;
        write
            .send(Message::Text(text.into()))
            .await
            .map_err(StockStreamError::WebSocketError)
    }

    /// Caller-initiated teardown: closes the channel if open, cancels
    /// any pending reconnect, clears every subscription, and resets
    /// the attempt counter. Safe to call repeatedly; the client stays
    /// ready for a fresh `run()`.
    pub async fn disconnect(&self) {
        self.shutdown.send_replace(true);
        self.dispatcher.clear();
        let mut state = self.state.lock().await;
        state.reconnect_attempts = 0;
        state.mark_disconnected();
        drop(state);
        monitoring::CONNECTED_GAUGE.set(0.0);
        info!("client disconnected");
    }

    /// Emit a local `connection` envelope through the dispatcher.
    fn dispatch_status(&self, status: &str, terminal: bool) {
        let mut data = json!({ "status": status });
        if terminal {
            data["terminal"] = json!(true);
        }
        self.dispatcher.dispatch(event_type::CONNECTION, &data);
    }

    pub async fn channel_state(&self) -> ChannelState {
        self.state.lock().await.channel_state
    }
}
