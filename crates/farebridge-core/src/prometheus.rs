//! Prometheus metrics for Farebridge routing observability.
//!
//! Exposes metrics compatible with Prometheus/OpenMetrics format:
//! - `farebridge_selections_total{service_type,outcome}` - Counter of selection calls
//! - `farebridge_attempts_total{provider,service_type,result}` - Counter of reported attempts
//! - `farebridge_attempt_duration_seconds{provider}` - Histogram of attempt latency
//! - `farebridge_circuit_transitions_total{provider,from,to}` - Counter of breaker transitions
//! - `farebridge_circuit_state{provider}` - Gauge, 0 closed / 1 half-open / 2 open
//! - `farebridge_quota_used_percent{provider}` - Gauge of quota consumption
//! - `farebridge_health_probes_total{provider,status}` - Counter of probe results
//! - `farebridge_probe_duration_seconds{provider}` - Histogram of probe latency
//! - `farebridge_state_conflicts_total{entity}` - Counter of compare-and-swap conflicts
//! - `farebridge_providers_total` / `farebridge_providers_available` - Gauges
//! - `farebridge_uptime_seconds` - Gauge of process uptime

use farebridge_types::models::{CircuitState, HealthStatus, ServiceType};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static METRICS_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Supplier search APIs answer in 200ms to a few seconds; timeouts sit near 10s.
const SUPPLIER_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

/// Initialize the Prometheus recorder. Safe to call more than once.
///
/// If a global recorder is already installed (another component or a test
/// harness), metrics are rendered from a detached handle instead.
pub fn init_metrics() -> PrometheusHandle {
    let _ = METRICS_START_TIME.get_or_init(Instant::now);

    let handle = PROMETHEUS_HANDLE.get_or_init(|| {
        let builder = match PrometheusBuilder::new().set_buckets(SUPPLIER_LATENCY_BUCKETS) {
            Ok(builder) => builder,
            Err(e) => {
                tracing::warn!("Invalid histogram buckets, using defaults: {}", e);
                PrometheusBuilder::new()
            },
        };
        let handle = match builder.install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Prometheus recorder not installed: {}", e);
                PrometheusBuilder::new().build_recorder().handle()
            },
        };

        describe_counter!("farebridge_selections_total", "Provider selection calls by outcome");
        describe_counter!("farebridge_attempts_total", "Provider attempts reported by callers");
        describe_histogram!(
            "farebridge_attempt_duration_seconds",
            "Latency of reported provider attempts in seconds"
        );
        describe_counter!(
            "farebridge_circuit_transitions_total",
            "Circuit breaker state transitions"
        );
        describe_gauge!(
            "farebridge_circuit_state",
            "Circuit state per provider (0 closed, 1 half-open, 2 open)"
        );
        describe_gauge!("farebridge_quota_used_percent", "Quota consumption per provider");
        describe_counter!("farebridge_health_probes_total", "Health probe results per provider");
        describe_histogram!(
            "farebridge_probe_duration_seconds",
            "Health probe latency in seconds"
        );
        describe_counter!(
            "farebridge_state_conflicts_total",
            "Optimistic concurrency conflicts on routing state"
        );
        describe_gauge!("farebridge_providers_total", "Registered providers");
        describe_gauge!(
            "farebridge_providers_available",
            "Enabled providers neither circuit-open nor over quota"
        );
        describe_gauge!("farebridge_uptime_seconds", "Process uptime in seconds");

        handle
    });

    handle.clone()
}

pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

pub fn record_selection(service_type: ServiceType, outcome: &'static str) {
    counter!(
        "farebridge_selections_total",
        "service_type" => service_type.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_attempt(
    provider_id: &str,
    service_type: ServiceType,
    success: bool,
    response_time_ms: Option<i64>,
) {
    let result = if success { "success" } else { "failure" };
    counter!(
        "farebridge_attempts_total",
        "provider" => provider_id.to_string(),
        "service_type" => service_type.as_str(),
        "result" => result
    )
    .increment(1);

    if let Some(ms) = response_time_ms {
        histogram!("farebridge_attempt_duration_seconds", "provider" => provider_id.to_string())
            .record(ms.max(0) as f64 / 1000.0);
    }
}

pub fn record_circuit_transition(provider_id: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "farebridge_circuit_transitions_total",
        "provider" => provider_id.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    update_circuit_gauge(provider_id, to);
}

pub fn update_circuit_gauge(provider_id: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("farebridge_circuit_state", "provider" => provider_id.to_string()).set(value);
}

pub fn update_quota_gauge(provider_id: &str, percentage_used: f64) {
    gauge!("farebridge_quota_used_percent", "provider" => provider_id.to_string())
        .set(percentage_used);
}

pub fn record_probe(provider_id: &str, status: HealthStatus, response_time_ms: Option<i64>) {
    counter!(
        "farebridge_health_probes_total",
        "provider" => provider_id.to_string(),
        "status" => status.as_str()
    )
    .increment(1);

    if let Some(ms) = response_time_ms {
        histogram!("farebridge_probe_duration_seconds", "provider" => provider_id.to_string())
            .record(ms.max(0) as f64 / 1000.0);
    }
}

pub fn record_state_conflict(entity: &str) {
    counter!("farebridge_state_conflicts_total", "entity" => entity.to_string()).increment(1);
}

pub fn update_provider_gauges(total: usize, available: usize) {
    gauge!("farebridge_providers_total").set(total as f64);
    gauge!("farebridge_providers_available").set(available as f64);
}

pub fn update_uptime_gauge() {
    if let Some(start) = METRICS_START_TIME.get() {
        gauge!("farebridge_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}

/// Render all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    update_uptime_gauge();
    get_prometheus_handle().map(PrometheusHandle::render).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_after_init_contains_recorded_series() {
        let _ = init_metrics();
        record_selection(ServiceType::Flight, "ok");
        record_state_conflict("quota_records");

        let text = render_metrics();
        assert!(text.contains("farebridge_selections_total"));
        assert!(text.contains("farebridge_state_conflicts_total"));
    }

    #[test]
    fn test_recording_without_init_does_not_panic() {
        record_attempt("a", ServiceType::Hotel, false, Some(1200));
        record_probe("a", HealthStatus::Outage, None);
        update_circuit_gauge("a", CircuitState::Open);
    }
}
