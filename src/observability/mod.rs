use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Start the Prometheus HTTP exporter on :9000. After this call, any
/// metrics recorded via the `metrics` macros are exported at /metrics.
pub fn init_metrics_server() -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], 9000))
        .install()?;
    Ok(())
}

// ── Store metrics ────────────────────────────────────────────────

pub fn record_action(kind: &'static str) {
    counter!("store_actions_total", "kind" => kind).increment(1);
}

// ── Effect metrics ───────────────────────────────────────────────

pub fn record_backend_latency(endpoint: &'static str, elapsed: Duration) {
    histogram!("backend_request_latency_ms", "endpoint" => endpoint)
        .record(elapsed.as_secs_f64() * 1_000.0);
}

/// A completion that arrived after its generation was superseded or
/// after teardown, and was therefore never dispatched.
pub fn record_dropped_result(channel: &'static str) {
    counter!("effect_results_dropped_total", "channel" => channel).increment(1);
}
