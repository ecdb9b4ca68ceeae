use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let registry = Registry::new();
    registry
        .register(Box::new(WEBHOOK_REQUESTS.clone()))
        .expect("webhook request counter registers once");
    registry
        .register(Box::new(TOKEN_CHECKS.clone()))
        .expect("token check counter registers once");
    registry
        .register(Box::new(RELAY_LATENCY.clone()))
        .expect("relay latency histogram registers once");
    registry
});

/// Webhook POSTs by outcome (relayed, configuration_error, auth_missing, ...)
pub static WEBHOOK_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bagibagi_webhook_requests_total",
            "Donation webhooks received, by outcome",
        ),
        &["outcome"],
    )
    .unwrap()
});

pub static TOKEN_CHECKS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bagibagi_token_checks_total",
            "Webhook token checks, by status",
        ),
        &["status"],
    )
    .unwrap()
});

pub static RELAY_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bagibagi_relay_duration_seconds",
            "MessagingService publish latency in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["result"],
    )
    .unwrap()
});

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_includes_counters() {
        WEBHOOK_REQUESTS.with_label_values(&["relayed"]).inc();
        let output = metrics_output();
        assert!(output.contains("bagibagi_webhook_requests_total"));
    }
}
