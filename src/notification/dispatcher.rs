use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::mailer::{Mailer, OutboundEmail};
use crate::metrics::JobMetrics;
use crate::store::DocumentStore;
use crate::template::{render_email, Branding};

use super::{
    preference_allows, DeliveryStatus, JobKind, JobReport, NotificationJob, RecipientCandidate,
    RecipientOutcome,
};

/// Statistics for the fan-out dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total jobs dispatched
    pub jobs_total: AtomicU64,
    /// Total recipient emails delivered
    pub delivered_total: AtomicU64,
    /// Total recipients skipped by preference
    pub skipped_total: AtomicU64,
    /// Total recipient deliveries that failed
    pub failed_total: AtomicU64,
    /// New-message jobs
    pub message_jobs: AtomicU64,
    /// Price-drop jobs
    pub price_drop_jobs: AtomicU64,
    /// Weekly-digest jobs
    pub digest_jobs: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            jobs_total: self.jobs_total.load(Ordering::Relaxed),
            delivered_total: self.delivered_total.load(Ordering::Relaxed),
            skipped_total: self.skipped_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            message_jobs: self.message_jobs.load(Ordering::Relaxed),
            price_drop_jobs: self.price_drop_jobs.load(Ordering::Relaxed),
            digest_jobs: self.digest_jobs.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub jobs_total: u64,
    pub delivered_total: u64,
    pub skipped_total: u64,
    pub failed_total: u64,
    pub message_jobs: u64,
    pub price_drop_jobs: u64,
    pub digest_jobs: u64,
}

/// Fans a notification job out to its recipients as individual emails.
///
/// Each recipient is handled independently: profile lookup, preference
/// gate, template render, send. One recipient failing never aborts the
/// rest of the job.
pub struct FanOutDispatcher {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    branding: Branding,
    fan_out_width: usize,
    stats: DispatcherStats,
}

impl FanOutDispatcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        branding: Branding,
        fan_out_width: usize,
    ) -> Self {
        Self {
            store,
            mailer,
            branding,
            fan_out_width: fan_out_width.max(1),
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch one job to every recipient it names.
    ///
    /// Always returns a report; per-recipient problems are recorded as
    /// outcomes rather than surfaced as errors.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, job),
        fields(
            job_id = %job.id,
            kind = %job.kind(),
            dedupe_key = %job.dedupe_key,
            recipient_count = job.recipients.len()
        )
    )]
    pub async fn dispatch(&self, job: NotificationJob) -> JobReport {
        let started = Instant::now();
        let kind = job.kind();

        JobMetrics::record_dispatched(kind.as_str());
        JobMetrics::observe_recipients(job.recipients.len());

        // Single-recipient jobs skip the fan-out machinery
        let outcomes = if job.recipients.len() <= 1 {
            let mut outcomes = Vec::with_capacity(job.recipients.len());
            for candidate in &job.recipients {
                outcomes.push(self.deliver(&job, candidate).await);
            }
            outcomes
        } else {
            let sends: Vec<_> = job
                .recipients
                .iter()
                .map(|candidate| self.deliver(&job, candidate))
                .collect();
            join_all_bounded(self.fan_out_width, sends).await
        };

        let duration = started.elapsed();
        JobMetrics::record_duration(kind.as_str(), duration.as_secs_f64());

        let report = JobReport::from_outcomes(&job, outcomes, duration.as_millis() as u64);

        JobMetrics::record_delivered(report.delivered as u64);
        JobMetrics::record_skipped(report.skipped as u64);
        JobMetrics::record_failed(report.failed as u64);

        // Update stats
        self.stats.jobs_total.fetch_add(1, Ordering::Relaxed);
        self.stats
            .delivered_total
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .skipped_total
            .fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.stats
            .failed_total
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        match kind {
            JobKind::Message => self.stats.message_jobs.fetch_add(1, Ordering::Relaxed),
            JobKind::PriceDrop => self.stats.price_drop_jobs.fetch_add(1, Ordering::Relaxed),
            JobKind::Digest => self.stats.digest_jobs.fetch_add(1, Ordering::Relaxed),
        };

        tracing::debug!(
            job_id = %report.job_id,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Dispatched notification job"
        );

        report
    }

    async fn deliver(
        &self,
        job: &NotificationJob,
        candidate: &RecipientCandidate,
    ) -> RecipientOutcome {
        let status = self.deliver_status(job, candidate).await;
        RecipientOutcome {
            user_id: candidate.user_id.clone(),
            status,
        }
    }

    async fn deliver_status(
        &self,
        job: &NotificationJob,
        candidate: &RecipientCandidate,
    ) -> DeliveryStatus {
        // Profiles the trigger already resolved skip the extra lookup
        let profile = match &candidate.profile {
            Some(profile) => profile.clone(),
            None => match self.store.user_profile(&candidate.user_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    tracing::warn!(
                        user_id = %candidate.user_id,
                        job_id = %job.id,
                        "Recipient profile not found"
                    );
                    return DeliveryStatus::Failed {
                        error: "profile not found".to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %candidate.user_id,
                        job_id = %job.id,
                        error = %e,
                        "Failed to load recipient profile"
                    );
                    return DeliveryStatus::Failed {
                        error: e.to_string(),
                    };
                }
            },
        };

        if !preference_allows(&profile.email_notifications, job.kind()) {
            tracing::debug!(
                user_id = %candidate.user_id,
                job_id = %job.id,
                "Recipient opted out"
            );
            return DeliveryStatus::Skipped {
                reason: "opt_out".to_string(),
            };
        }

        let rendered = render_email(&job.payload, profile.display_name.as_deref(), &self.branding);
        let email = OutboundEmail {
            to_email: profile.email.clone(),
            to_name: profile.display_name.clone(),
            subject: rendered.subject,
            html: rendered.html,
        };

        match self.mailer.send(email).await {
            Ok(delivery_id) => DeliveryStatus::Delivered { delivery_id },
            Err(e) => {
                tracing::warn!(
                    user_id = %candidate.user_id,
                    job_id = %job.id,
                    error = %e,
                    "Email send failed"
                );
                DeliveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Run a batch of futures with at most `width` in flight at once.
///
/// Results come back in the order the futures were given, regardless of
/// completion order.
pub(crate) async fn join_all_bounded<F>(width: usize, tasks: Vec<F>) -> Vec<F::Output>
where
    F: std::future::Future,
{
    let width = width.max(1);
    let mut in_flight = FuturesUnordered::new();
    let mut finished: Vec<(usize, F::Output)> = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.into_iter().enumerate() {
        in_flight.push(async move { (index, task.await) });

        // Wait for a slot once the concurrency limit is reached
        while in_flight.len() >= width {
            if let Some(done) = in_flight.next().await {
                finished.push(done);
            } else {
                break;
            }
        }
    }

    // Drain the remaining futures
    while let Some(done) = in_flight.next().await {
        finished.push(done);
    }

    finished.sort_by_key(|(index, _)| *index);
    finished.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::{JobPayload, MessagePayload};
    use super::*;
    use crate::mailer::MemoryMailer;
    use crate::store::{MemoryStore, NotificationPreferences, UserProfile};

    fn profile(id: &str, email: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: email.to_string(),
            display_name: Some("Jordan".to_string()),
            email_notifications: NotificationPreferences::default(),
        }
    }

    fn message_job(recipients: Vec<RecipientCandidate>) -> NotificationJob {
        NotificationJob::new(
            "message:conv-1:user-9:0".to_string(),
            JobPayload::Message(MessagePayload {
                conversation_id: "conv-1".to_string(),
                sender_name: Some("Alex".to_string()),
                listing_title: Some("Canoe".to_string()),
                message_text: "Is this still available?".to_string(),
            }),
            recipients,
        )
    }

    fn dispatcher(store: Arc<MemoryStore>, mailer: Arc<MemoryMailer>) -> FanOutDispatcher {
        let branding = Branding {
            site_name: "Test Classifieds".to_string(),
            base_url: "https://example.com".to_string(),
        };
        FanOutDispatcher::new(store, mailer, branding, 4)
    }

    #[tokio::test]
    async fn test_delivers_with_job_carried_profile() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(store, mailer.clone());

        let candidate = RecipientCandidate::with_profile(profile("u1", "u1@example.com"));
        let report = dispatcher.dispatch(message_job(vec![candidate])).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(mailer.send_count(), 1);
        assert!(report.outcomes[0].status.is_delivered());
    }

    #[tokio::test]
    async fn test_loads_profile_from_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert_profile(profile("u1", "u1@example.com"));
        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(store, mailer.clone());

        let report = dispatcher
            .dispatch(message_job(vec![RecipientCandidate::by_id("u1")]))
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(mailer.sent_to("u1@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_is_failed_outcome() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(store, mailer.clone());

        let report = dispatcher
            .dispatch(message_job(vec![RecipientCandidate::by_id("ghost")]))
            .await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(mailer.send_count(), 0);
        assert!(report.outcomes[0].status.is_failed());
    }

    #[tokio::test]
    async fn test_opted_out_recipient_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let mut opted_out = profile("u1", "u1@example.com");
        opted_out.email_notifications.messages = Some(false);
        store.insert_profile(opted_out);
        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(store, mailer.clone());

        let report = dispatcher
            .dispatch(message_job(vec![RecipientCandidate::by_id("u1")]))
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(mailer.send_count(), 0);
        assert!(report.outcomes[0].status.is_skipped());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_rest() {
        let store = Arc::new(MemoryStore::new());
        store.insert_profile(profile("u1", "u1@example.com"));
        store.insert_profile(profile("u2", "u2@example.com"));
        store.insert_profile(profile("u3", "u3@example.com"));
        let mailer = Arc::new(MemoryMailer::new());
        mailer.fail_for("u2@example.com", "mailbox full");
        let dispatcher = dispatcher(store, mailer.clone());

        let report = dispatcher
            .dispatch(message_job(vec![
                RecipientCandidate::by_id("u1"),
                RecipientCandidate::by_id("u2"),
                RecipientCandidate::by_id("u3"),
            ]))
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        // Outcomes keep the recipient order even under concurrent sends
        assert_eq!(report.outcomes[0].user_id, "u1");
        assert_eq!(report.outcomes[1].user_id, "u2");
        assert_eq!(report.outcomes[2].user_id, "u3");
        assert!(report.outcomes[1].status.is_failed());
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_jobs() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(store, mailer);

        let first = RecipientCandidate::with_profile(profile("u1", "u1@example.com"));
        let second = RecipientCandidate::with_profile(profile("u2", "u2@example.com"));
        dispatcher.dispatch(message_job(vec![first])).await;
        dispatcher.dispatch(message_job(vec![second])).await;

        let stats = dispatcher.stats();
        assert_eq!(stats.jobs_total, 2);
        assert_eq!(stats.delivered_total, 2);
        assert_eq!(stats.message_jobs, 2);
        assert_eq!(stats.digest_jobs, 0);
    }

    #[tokio::test]
    async fn test_join_all_bounded_preserves_input_order() {
        let tasks: Vec<_> = (0u64..4)
            .map(|i| async move {
                // Earlier tasks finish later
                tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                i
            })
            .collect();

        let results = join_all_bounded(8, tasks).await;
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_join_all_bounded_with_width_one() {
        let tasks: Vec<_> = (0u64..3).map(|i| async move { i * 2 }).collect();
        let results = join_all_bounded(1, tasks).await;
        assert_eq!(results, vec![0, 2, 4]);
    }
}
