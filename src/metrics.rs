//! Prometheus metrics for the voter.
//!
//! Served on /metrics by the API responder for scraping.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge,
    GaugeVec};

lazy_static! {
    pub static ref HEIGHTS_PROCESSED: CounterVec = register_counter_vec!(
        "voter_heights_processed_total",
        "Total number of heights fully processed",
        &["chain"]
    )
    .unwrap();

    pub static ref LATEST_HEIGHT: GaugeVec = register_gauge_vec!(
        "voter_latest_height",
        "Next height each monitor will process",
        &["chain"]
    )
    .unwrap();

    pub static ref TRANSFERS_SUBMITTED: CounterVec = register_counter_vec!(
        "voter_transfers_submitted_total",
        "Cross-chain transfers forwarded to the relay chain",
        &["status"]
    )
    .unwrap();

    pub static ref SIGNATURES_SUBMITTED: CounterVec = register_counter_vec!(
        "voter_signatures_submitted_total",
        "Settlement signatures submitted to the relay chain",
        &["status"]
    )
    .unwrap();

    pub static ref RPC_ERRORS: CounterVec = register_counter_vec!(
        "voter_rpc_errors_total",
        "RPC failures that triggered backoff and client rotation",
        &["chain"]
    )
    .unwrap();

    pub static ref UP: Gauge = register_gauge!(
        "voter_up",
        "Whether the voter is up and running"
    )
    .unwrap();
}

/// Record a fully processed height and the monitor's new frontier.
pub fn record_height_processed(chain: &str, next_height: u64) {
    HEIGHTS_PROCESSED.with_label_values(&[chain]).inc();
    LATEST_HEIGHT
        .with_label_values(&[chain])
        .set(next_height as f64);
}

pub fn record_transfer_submitted(success: bool) {
    let status = if success { "success" } else { "failure" };
    TRANSFERS_SUBMITTED.with_label_values(&[status]).inc();
}

pub fn record_signature_submitted(success: bool) {
    let status = if success { "success" } else { "failure" };
    SIGNATURES_SUBMITTED.with_label_values(&[status]).inc();
}

pub fn record_rpc_error(chain: &str) {
    RPC_ERRORS.with_label_values(&[chain]).inc();
}
