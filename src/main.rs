use anyhow::Result;
use clap::Parser;
use rs_stockstream::{
    alerts::AlertFeed, cli::Args, client::StockStreamClient, config::Config,
    dispatcher::Dispatcher, monitoring::setup_metrics, reconciler::LiveViewReconciler,
    tracing_setup::setup_tracing, ui::StatusBanner,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs)?;
    info!(
        "Starting stock stream client v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let dispatcher = Arc::new(Dispatcher::new());

    let feed = AlertFeed::new(config.alerts.retention, config.alerts.ttl);
    feed.attach(&dispatcher);

    // The initial snapshot comes from the REST layer; until the host
    // application loads one, incoming updates are dropped.
    let reconciler = LiveViewReconciler::new();
    reconciler.attach(&dispatcher);

    let banner = StatusBanner::new(feed.clone(), config.logging.quiet);
    banner.attach(&dispatcher);

    let client = Arc::new(StockStreamClient::new(
        Arc::clone(&config),
        Arc::clone(&dispatcher),
    ));

    {
        let client = Arc::clone(&client);
        let feed = feed.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                client.disconnect().await;
                feed.shutdown();
            }
        });
    }

    info!("Client started. Press Ctrl+C to shutdown...");
    client.run().await?;

    info!("Client stopped");
    Ok(())
}
