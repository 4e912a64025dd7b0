#![doc = include_str!("../docs/rustdoc.md")]

/// Bounded, self-expiring alert feed.
pub mod alerts;
/// Command-line argument definitions.
pub mod cli;
/// WebSocket client implementation and runtime loop.
pub mod client;
/// Channel lifecycle state and connection counters.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Subscription registry and synchronous event fan-out.
pub mod dispatcher;
/// Inbound frame decoding into typed envelopes.
pub mod envelope;
/// Error types used across the crate.
pub mod error;
/// Metrics counters and Prometheus exporter.
pub mod monitoring;
/// Partial-update reconciliation into the dashboard snapshot.
pub mod reconciler;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Status banner presentation layer.
pub mod ui;

/// Primary crate error type.
pub use error::StockStreamError;
