/// Metrics and telemetry for the Waypost directory
///
/// Prometheus-compatible counters for the flows this service owns:
/// moderation transitions, geocoder traffic, address validations, and
/// proximity queries.
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Moderation transitions by entity kind and target state
    pub static ref MODERATION_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_transitions_total",
        "Total number of moderation state transitions",
        &["kind", "target"]
    )
    .unwrap();

    /// Geocoder lookups by outcome
    pub static ref GEOCODER_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geocoder_lookups_total",
        "Total number of geocoding provider lookups",
        &["status"]
    )
    .unwrap();

    /// Address validations by verdict
    pub static ref ADDRESS_VALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "address_validations_total",
        "Total number of address validations",
        &["verdict"]
    )
    .unwrap();

    /// Proximity searches by outcome
    pub static ref PROXIMITY_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "proximity_queries_total",
        "Total number of proximity searches",
        &["status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a moderation transition
pub fn record_transition(kind: &str, target: &str) {
    MODERATION_TRANSITIONS_TOTAL
        .with_label_values(&[kind, target])
        .inc();
}

/// Record a geocoder lookup
pub fn record_geocoder_lookup(status: &str) {
    GEOCODER_LOOKUPS_TOTAL.with_label_values(&[status]).inc();
}

/// Record an address validation verdict
pub fn record_address_validation(valid: bool) {
    ADDRESS_VALIDATIONS_TOTAL
        .with_label_values(&[if valid { "valid" } else { "invalid" }])
        .inc();
}

/// Record a proximity search
pub fn record_proximity_query(status: &str) {
    PROXIMITY_QUERIES_TOTAL.with_label_values(&[status]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_transition() {
        record_transition("poi_submission", "approved");
        let metrics = render_metrics();
        assert!(metrics.contains("moderation_transitions_total"));
    }

    #[test]
    fn test_record_geo_metrics() {
        record_geocoder_lookup("ok");
        record_address_validation(true);
        record_address_validation(false);
        record_proximity_query("ok");

        let metrics = render_metrics();
        assert!(metrics.contains("geocoder_lookups_total"));
        assert!(metrics.contains("address_validations_total"));
        assert!(metrics.contains("proximity_queries_total"));
    }
}
