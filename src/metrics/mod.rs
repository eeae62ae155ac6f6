//! Prometheus metrics for the notification service.
//!
//! This module provides metrics for monitoring the fan-out pipeline:
//! - Trigger metrics (invocations by trigger and outcome)
//! - Job metrics (dispatched jobs, per-job duration, recipients per job)
//! - Recipient metrics (delivered, skipped, failed)
//! - Digest metrics (runs, users skipped)

mod helpers;

pub use helpers::{encode_metrics, DigestMetrics, JobMetrics, TriggerMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "classifieds";

lazy_static! {
    // ============================================================================
    // Trigger Metrics
    // ============================================================================

    /// Total trigger invocations by trigger name and outcome
    pub static ref TRIGGER_INVOCATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_trigger_invocations_total", METRIC_PREFIX),
        "Total trigger invocations",
        &["trigger", "outcome"]
    ).unwrap();

    // ============================================================================
    // Job Metrics
    // ============================================================================

    /// Total notification jobs dispatched by kind
    pub static ref JOBS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_jobs_dispatched_total", METRIC_PREFIX),
        "Total notification jobs dispatched",
        &["kind"]
    ).unwrap();

    /// Job dispatch duration (resolution through last delivery)
    pub static ref JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        format!("{}_job_duration_seconds", METRIC_PREFIX),
        "Job dispatch duration in seconds",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    /// Recipients per dispatched job
    pub static ref JOB_RECIPIENTS: Histogram = register_histogram!(
        format!("{}_job_recipients", METRIC_PREFIX),
        "Distribution of recipients per job",
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    ).unwrap();

    // ============================================================================
    // Recipient Metrics
    // ============================================================================

    /// Total recipients delivered to
    pub static ref RECIPIENTS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_delivered_total", METRIC_PREFIX),
        "Total recipients with a successful email delivery"
    ).unwrap();

    /// Total recipients skipped (opted out or no profile)
    pub static ref RECIPIENTS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_skipped_total", METRIC_PREFIX),
        "Total recipients skipped before delivery"
    ).unwrap();

    /// Total per-recipient delivery failures
    pub static ref RECIPIENTS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_failed_total", METRIC_PREFIX),
        "Total per-recipient delivery failures"
    ).unwrap();

    // ============================================================================
    // Digest Metrics
    // ============================================================================

    /// Total weekly digest runs
    pub static ref DIGEST_RUNS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_digest_runs_total", METRIC_PREFIX),
        "Total weekly digest runs"
    ).unwrap();

    /// Digest subscribers skipped because no new listings matched
    pub static ref DIGEST_USERS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_digest_users_skipped_total", METRIC_PREFIX),
        "Digest subscribers skipped for an empty listing window"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // Initialize some metrics first (lazy_static requires first access)
        RECIPIENTS_DELIVERED_TOTAL.inc();

        // Verify encoding doesn't panic and contains expected prefix
        let result = encode_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("classifieds_recipients_delivered_total"));
    }

    #[test]
    fn test_trigger_metrics() {
        TRIGGER_INVOCATIONS_TOTAL
            .with_label_values(&["message_created", "completed"])
            .inc();
        TRIGGER_INVOCATIONS_TOTAL
            .with_label_values(&["listing_updated", "skipped"])
            .inc();
        // Just verify no panics
    }

    #[test]
    fn test_job_metrics() {
        JOBS_DISPATCHED_TOTAL.with_label_values(&["message"]).inc();
        JOB_DURATION_SECONDS
            .with_label_values(&["message"])
            .observe(0.25);
        JOB_RECIPIENTS.observe(3.0);
        // Just verify no panics
    }

    #[test]
    fn test_digest_metrics() {
        DIGEST_RUNS_TOTAL.inc();
        DIGEST_USERS_SKIPPED_TOTAL.inc();
        // Just verify no panics
    }
}
