//! Engine metrics
//!
//! Emitted through the `metrics` facade; nothing is exported unless the
//! process installs a recorder (the service installs a Prometheus one).

use crate::error::AggregateError;
use crate::poller::CycleReport;
use metrics::{counter, describe_counter};

pub const POLLER_CYCLES: &str = "crypto_poller_cycles_total";
pub const POLLER_ROWS_UPDATED: &str = "crypto_poller_rows_updated_total";
pub const POLLER_ROWS_FAILED: &str = "crypto_poller_rows_failed_total";
pub const POLLER_ROWS_SKIPPED: &str = "crypto_poller_rows_skipped_total";
pub const AGGREGATE_REQUESTS: &str = "crypto_aggregate_requests_total";
pub const AGGREGATE_FAILURES: &str = "crypto_aggregate_failures_total";
pub const PROVIDER_FAILURES: &str = "crypto_aggregate_provider_failures_total";

/// Register metric descriptions with the installed recorder
pub fn describe() {
    describe_counter!(POLLER_CYCLES, "Completed refresh cycles");
    describe_counter!(POLLER_ROWS_UPDATED, "Layout rows refreshed by the poller");
    describe_counter!(POLLER_ROWS_FAILED, "Layout rows whose vendor fetch failed");
    describe_counter!(POLLER_ROWS_SKIPPED, "Layout rows without a resolvable vendor");
    describe_counter!(AGGREGATE_REQUESTS, "Aggregation requests");
    describe_counter!(AGGREGATE_FAILURES, "Failed aggregation requests by error kind");
    describe_counter!(PROVIDER_FAILURES, "Failed or timed out quote provider calls");
}

pub fn record_cycle(report: &CycleReport) {
    counter!(POLLER_CYCLES).increment(1);
    counter!(POLLER_ROWS_UPDATED).increment(report.updated as u64);
    counter!(POLLER_ROWS_FAILED).increment(report.failed as u64);
    counter!(POLLER_ROWS_SKIPPED).increment(report.skipped as u64);
}

pub fn record_aggregate<T>(result: &Result<T, AggregateError>) {
    counter!(AGGREGATE_REQUESTS).increment(1);
    if let Err(e) = result {
        counter!(AGGREGATE_FAILURES, "kind" => e.kind()).increment(1);
    }
}

pub fn record_provider_failure(provider: &str) {
    counter!(PROVIDER_FAILURES, "provider" => provider.to_string()).increment(1);
}
