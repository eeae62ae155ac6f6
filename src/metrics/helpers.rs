//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DIGEST_RUNS_TOTAL, DIGEST_USERS_SKIPPED_TOTAL, JOBS_DISPATCHED_TOTAL, JOB_DURATION_SECONDS,
    JOB_RECIPIENTS, RECIPIENTS_DELIVERED_TOTAL, RECIPIENTS_FAILED_TOTAL, RECIPIENTS_SKIPPED_TOTAL,
    TRIGGER_INVOCATIONS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording trigger metrics
pub struct TriggerMetrics;

impl TriggerMetrics {
    /// Record a trigger that produced at least one job
    pub fn record_completed(trigger: &str) {
        TRIGGER_INVOCATIONS_TOTAL
            .with_label_values(&[trigger, "completed"])
            .inc();
    }

    /// Record a trigger that ended as a precondition no-op
    pub fn record_skipped(trigger: &str) {
        TRIGGER_INVOCATIONS_TOTAL
            .with_label_values(&[trigger, "skipped"])
            .inc();
    }

    /// Record a trigger that aborted with a systemic error
    pub fn record_error(trigger: &str) {
        TRIGGER_INVOCATIONS_TOTAL
            .with_label_values(&[trigger, "error"])
            .inc();
    }
}

/// Helper struct for recording job metrics
pub struct JobMetrics;

impl JobMetrics {
    /// Record a dispatched job
    pub fn record_dispatched(kind: &str) {
        JOBS_DISPATCHED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record job dispatch duration
    pub fn record_duration(kind: &str, secs: f64) {
        JOB_DURATION_SECONDS.with_label_values(&[kind]).observe(secs);
    }

    /// Record the recipient count of a job
    pub fn observe_recipients(count: usize) {
        JOB_RECIPIENTS.observe(count as f64);
    }

    /// Record successful deliveries
    pub fn record_delivered(count: u64) {
        RECIPIENTS_DELIVERED_TOTAL.inc_by(count);
    }

    /// Record skipped recipients
    pub fn record_skipped(count: u64) {
        RECIPIENTS_SKIPPED_TOTAL.inc_by(count);
    }

    /// Record failed deliveries
    pub fn record_failed(count: u64) {
        RECIPIENTS_FAILED_TOTAL.inc_by(count);
    }
}

/// Helper struct for digest metrics
pub struct DigestMetrics;

impl DigestMetrics {
    /// Record a digest run
    pub fn record_run() {
        DIGEST_RUNS_TOTAL.inc();
    }

    /// Record subscribers skipped for an empty window
    pub fn record_users_skipped(count: u64) {
        DIGEST_USERS_SKIPPED_TOTAL.inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_metrics() {
        TriggerMetrics::record_completed("message_created");
        TriggerMetrics::record_skipped("listing_updated");
        TriggerMetrics::record_error("weekly_digest");
        // Just verify no panics
    }

    #[test]
    fn test_job_metrics() {
        JobMetrics::record_dispatched("price_drop");
        JobMetrics::record_duration("price_drop", 0.5);
        JobMetrics::observe_recipients(12);
        JobMetrics::record_delivered(10);
        JobMetrics::record_skipped(1);
        JobMetrics::record_failed(1);
        // Just verify no panics
    }

    #[test]
    fn test_digest_metrics() {
        DigestMetrics::record_run();
        DigestMetrics::record_users_skipped(3);
        // Just verify no panics
    }
}
