//! Transport-loop instrumentation points, built on the
//! `metrics` + `metrics-exporter-prometheus` dependency pair. The exporter's HTTP
//! listener is installed once in `main`; these are the call sites that feed
//! it (SPEC_FULL.md §1 ambient stack).

pub fn record_received() {
    metrics::counter!("ocpp_bridge_messages_received_total").increment(1);
}

pub fn record_completed() {
    metrics::counter!("ocpp_bridge_messages_completed_total").increment(1);
}

pub fn record_abandoned() {
    metrics::counter!("ocpp_bridge_messages_abandoned_total").increment(1);
}

pub fn record_handling_latency(seconds: f64) {
    metrics::histogram!("ocpp_bridge_handling_latency_seconds").record(seconds);
}
