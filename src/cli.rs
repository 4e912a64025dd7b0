use crate::config::BackoffPolicy;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "rs-stockstream",
    about = "websocket synchronization core for live stock dashboards",
    version
)]
pub struct Args {
    /// WebSocket endpoint URL of the dashboard gateway
    #[arg(short, long, default_value = "ws://127.0.0.1:5000/ws/stocks")]
    pub url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Delay between reconnection attempts in milliseconds
    #[arg(long, default_value = "3000")]
    pub reconnect_delay_ms: u64,

    /// Maximum number of reconnection attempts before giving up
    #[arg(long, default_value = "5")]
    pub max_reconnects: u32,

    /// Reconnection backoff policy
    #[arg(long, value_enum, default_value_t = BackoffPolicy::Fixed)]
    pub backoff: BackoffPolicy,

    /// Number of alerts retained in the notification feed
    #[arg(long, default_value = "5")]
    pub alert_retention: usize,

    /// Alert time-to-live in milliseconds
    #[arg(long, default_value = "10000")]
    pub alert_ttl_ms: u64,

    /// Quiet mode - suppress status banner output
    #[arg(long)]
    pub quiet: bool,
}
