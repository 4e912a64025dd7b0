use crate::error::StockStreamError;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("stockstream_messages_received_total"));
pub static STOCK_UPDATE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("stockstream_stock_updates_total"));
pub static ALERT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("stockstream_alerts_total"));
pub static DECODE_FAILURE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("stockstream_decode_failures_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("stockstream_reconnects_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("stockstream_connected"));

pub async fn setup_metrics(port: u16) -> Result<(), StockStreamError> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "rs-stockstream")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            MESSAGES_RECEIVED_COUNTER.absolute(0);
            STOCK_UPDATE_COUNTER.absolute(0);
            ALERT_COUNTER.absolute(0);
            DECODE_FAILURE_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {e}");
            Err(StockStreamError::MetricsError(e.to_string()))
        }
    }
}
