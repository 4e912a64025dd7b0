/// file: src/config.rs
/// description: runtime configuration assembled from CLI arguments
use crate::cli::Args;
use crate::error::StockStreamError;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub websocket: WebSocketConfig,
    pub alerts: AlertConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
    pub max_reconnects: u32,
    pub backoff: BackoffPolicy,
}

/// How the delay before each reconnect attempt is computed. `Fixed`
/// preserves the original dashboard behavior; `Exponential` is an
/// opt-in enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackoffPolicy {
    /// Same delay before every attempt.
    Fixed,
    /// Delay doubles per attempt, with up to 25% random jitter.
    Exponential,
}

impl WebSocketConfig {
    /// Delay to wait before reconnect attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffPolicy::Fixed => self.reconnect_delay,
            BackoffPolicy::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(6));
                let base = self.reconnect_delay.saturating_mul(factor);
                base + base.mul_f64(fastrand::f64() * 0.25)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Most recent alerts kept in the feed; older entries are evicted.
    pub retention: usize,
    /// How long an alert stays in the feed absent manual dismissal.
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub quiet: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, StockStreamError> {
        let url = Url::parse(&args.url)?;

        Ok(Config {
            websocket: WebSocketConfig {
                url,
                reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
                max_reconnects: args.max_reconnects,
                backoff: args.backoff,
            },
            alerts: AlertConfig {
                retention: args.alert_retention,
                ttl: Duration::from_millis(args.alert_ttl_ms),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            logging: LoggingConfig { quiet: args.quiet },
        })
    }
}
