/// file: src/client_state.rs
/// description: channel lifecycle state machine and connection counters
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Lifecycle of the one persistent channel. Exactly one instance per
/// client: `Disconnected -> Connecting -> Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug)]
pub struct ClientState {
    pub connection_id: String,
    pub channel_state: ChannelState,
    pub reconnect_attempts: u32,
    pub last_message_time: Option<Instant>,
    pub total_messages_received: u64,
    pub decode_failures: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().to_string(),
            channel_state: ChannelState::Disconnected,
            reconnect_attempts: 0,
            last_message_time: None,
            total_messages_received: 0,
            decode_failures: 0,
        }
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connecting(&mut self) {
        self.connection_id = uuid::Uuid::new_v4().to_string();
        self.channel_state = ChannelState::Connecting;
    }

    /// A successful open resets the attempt counter.
    pub fn mark_connected(&mut self) {
        self.channel_state = ChannelState::Connected;
        self.reconnect_attempts = 0;
        self.last_message_time = Some(Instant::now());
    }

    pub fn mark_disconnected(&mut self) {
        self.channel_state = ChannelState::Disconnected;
    }

    pub fn record_message(&mut self) {
        self.last_message_time = Some(Instant::now());
        self.total_messages_received += 1;
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn is_connected(&self) -> bool {
        self.channel_state == ChannelState::Connected
    }
}

pub type SharedClientState = Arc<Mutex<ClientState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_open_resets_attempt_counter() {
        let mut state = ClientState::new();
        state.reconnect_attempts = 3;
        state.mark_connecting();
        assert_eq!(state.channel_state, ChannelState::Connecting);

        state.mark_connected();
        assert!(state.is_connected());
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn each_connect_gets_a_fresh_connection_id() {
        let mut state = ClientState::new();
        let first = state.connection_id.clone();
        state.mark_connecting();
        assert_ne!(state.connection_id, first);
    }
}
