use std::sync::LazyLock;

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry, Encoder,
    Histogram, IntCounterVec, Registry as PrometheusRegistry, TextEncoder,
};

pub static METRICS_PROVIDER: LazyLock<MetricsProvider> = LazyLock::new(MetricsProvider::new);

pub static AUTH_DECISIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "auth_decisions_total",
        "Total number of authentication decisions",
        &["decision", "reason"],
        &METRICS_PROVIDER.registry
    )
    .expect("Failed to register auth_decisions metric")
});

pub static INTROSPECTION_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "introspection_requests_total",
        "Total number of token introspection requests",
        &["result"],
        &METRICS_PROVIDER.registry
    )
    .expect("Failed to register introspection_requests metric")
});

pub static INTROSPECTION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram_with_registry!(
        "introspection_duration_seconds",
        "Token introspection request duration",
        &METRICS_PROVIDER.registry
    )
    .expect("Failed to register introspection_duration metric")
});

pub struct MetricsProvider {
    registry: PrometheusRegistry,
}

impl MetricsProvider {
    fn new() -> Self {
        Self {
            registry: PrometheusRegistry::new(),
        }
    }

    /// Renders every registered metric in the Prometheus text format, together with
    /// the matching content type.
    pub fn gather(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
