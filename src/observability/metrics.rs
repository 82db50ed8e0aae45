//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sentinel_rpc_requests_total` (counter): requests by kind
//!   (`gated`, `forwarded`, `intent`)
//! - `sentinel_request_duration_seconds` (histogram): latency by kind
//! - `sentinel_verdicts_total` (counter): verdicts by outcome
//!   (`approved`, `rejected`, `soft_failure`)
//! - `sentinel_broadcasts_total` (counter): release broadcasts by result
//! - `sentinel_pending_transactions` (gauge): staged transactions
//! - `sentinel_intents_cached` (gauge): cached intents
//! - `sentinel_intents_evicted_total` (counter): intents removed by sweeps

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape listener on `addr`. Requires a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("sentinel_rpc_requests_total", "JSON-RPC requests handled, by kind");
    describe_histogram!(
        "sentinel_request_duration_seconds",
        "Request latency in seconds, by kind"
    );
    describe_counter!("sentinel_verdicts_total", "Risk verdicts, by outcome");
    describe_counter!("sentinel_broadcasts_total", "Release broadcasts, by result");
    describe_gauge!("sentinel_pending_transactions", "Transactions currently staged");
    describe_gauge!("sentinel_intents_cached", "Intents currently cached");
    describe_counter!("sentinel_intents_evicted_total", "Intents evicted by sweeps");

    tracing::info!(address = %addr, "Prometheus metrics listener started");
    Ok(())
}

pub fn record_request(kind: &'static str, start: Instant) {
    counter!("sentinel_rpc_requests_total", "kind" => kind).increment(1);
    histogram!("sentinel_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_verdict(outcome: &'static str) {
    counter!("sentinel_verdicts_total", "outcome" => outcome).increment(1);
}

pub fn record_broadcast(result: &'static str) {
    counter!("sentinel_broadcasts_total", "result" => result).increment(1);
}

pub fn record_pending(len: usize) {
    gauge!("sentinel_pending_transactions").set(len as f64);
}

pub fn record_intents(len: usize) {
    gauge!("sentinel_intents_cached").set(len as f64);
}

pub fn record_intents_evicted(count: usize) {
    counter!("sentinel_intents_evicted_total").increment(count as u64);
}
