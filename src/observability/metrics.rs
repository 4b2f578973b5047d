use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_order_opened(&self) {
        counter!("ledger_orders_opened_total").increment(1);
    }

    pub fn record_order_finished(&self, participant_count: usize, total_cost: Decimal) {
        counter!("ledger_orders_finished_total").increment(1);
        histogram!("ledger_order_participant_count").record(participant_count as f64);
        histogram!("ledger_order_total_cost").record(total_cost.to_f64().unwrap_or(0.0));
    }

    pub fn record_order_reopened(&self) {
        counter!("ledger_orders_reopened_total").increment(1);
    }

    pub fn record_order_cancelled(&self, by_owner: bool) {
        counter!("ledger_orders_cancelled_total", "by_owner" => by_owner.to_string()).increment(1);
    }

    pub fn record_debt_posted(&self, source: &str) {
        counter!("ledger_debts_posted_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_request_rejected(&self, operation: &str) {
        counter!("ledger_requests_rejected_total", "operation" => operation.to_string()).increment(1);
    }

    pub fn record_storage_operation(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("ledger_storage_operations_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("ledger_storage_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    METRICS.get_or_init(Metrics::new);

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("ledger_orders_opened_total", Unit::Count, "Total number of orders opened");
    describe_counter!("ledger_orders_finished_total", Unit::Count, "Total number of orders finished");
    describe_counter!("ledger_orders_reopened_total", Unit::Count, "Total number of orders reopened");
    describe_counter!("ledger_orders_cancelled_total", Unit::Count, "Total number of orders cancelled");
    describe_histogram!("ledger_order_participant_count", Unit::Count, "Cost lines per finished order");
    describe_histogram!("ledger_order_total_cost", "Total cost of finished orders, in the group's currency");

    describe_counter!("ledger_debts_posted_total", Unit::Count, "Total number of debt postings");
    describe_counter!("ledger_requests_rejected_total", Unit::Count, "Requests rejected with a user-facing error");

    describe_counter!("ledger_storage_operations_total", Unit::Count, "Total storage operations");
    describe_histogram!("ledger_storage_operation_duration_ms", Unit::Milliseconds, "Storage operation latency in milliseconds");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
