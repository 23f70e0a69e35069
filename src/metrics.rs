use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref REQUESTS_CREATED: IntCounter = register_int_counter!(
        "supplyline_requests_created_total",
        "Total number of product requests created"
    )
    .unwrap();
    pub static ref RESERVATIONS_CREATED: IntCounter = register_int_counter!(
        "supplyline_reservations_created_total",
        "Total number of reservations materialized"
    )
    .unwrap();
    pub static ref RESERVATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "supplyline_reservation_failures_total",
        "Reservation attempts rejected, by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref INSPECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "supplyline_inspections_total",
        "Inspection submissions by resulting verdict",
        &["verdict"]
    )
    .unwrap();
    pub static ref PROCUREMENT_RESOLUTIONS: IntCounterVec = register_int_counter_vec!(
        "supplyline_procurement_resolutions_total",
        "Procurement resolutions by action",
        &["action"]
    )
    .unwrap();
    pub static ref SHIPMENTS_DISPATCHED: IntCounter = register_int_counter!(
        "supplyline_shipments_dispatched_total",
        "Shipments handed to carriers"
    )
    .unwrap();
    pub static ref STOCK_COMMITTED_UNITS: IntCounter = register_int_counter!(
        "supplyline_stock_committed_units_total",
        "Units deducted from warehouse stock on completed requests"
    )
    .unwrap();
    pub static ref EVENTS_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "supplyline_events_processed_total",
        "Domain events drained from the event channel",
        &["event"]
    )
    .unwrap();
}

/// Renders the default registry in Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        REQUESTS_CREATED.inc();
        INSPECTIONS_TOTAL.with_label_values(&["AI_CONFIRMED"]).inc();
        let text = gather();
        assert!(text.contains("supplyline_requests_created_total"));
    }
}
