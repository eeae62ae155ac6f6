//! Notification job types.
//!
//! A [`NotificationJob`] is the unit of fan-out work: one rendered-from
//! payload plus the candidate recipients it goes to. Dispatching a job
//! produces a [`JobReport`] with one [`RecipientOutcome`] per candidate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::UserProfile;

/// The three email categories the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Message,
    PriceDrop,
    Digest,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Message => "message",
            JobKind::PriceDrop => "price_drop",
            JobKind::Digest => "digest",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content for a new-message email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub conversation_id: String,

    /// Display name the sender attached to the message
    pub sender_name: Option<String>,

    /// Title of the listing the conversation is about
    pub listing_title: Option<String>,

    /// Full message text; the template previews the first 100 characters
    pub message_text: String,
}

/// Content for a price-drop email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDropPayload {
    pub listing_id: String,
    pub listing_title: Option<String>,
    pub image_url: Option<String>,
    pub old_price: f64,
    pub new_price: f64,
    pub drop_amount: f64,
    pub drop_percent: i64,
}

/// One listing card in a digest email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestListing {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

/// Content for a weekly-digest email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestPayload {
    pub listings: Vec<DigestListing>,
}

/// Kind-specific content of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    Message(MessagePayload),
    PriceDrop(PriceDropPayload),
    Digest(DigestPayload),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Message(_) => JobKind::Message,
            JobPayload::PriceDrop(_) => JobKind::PriceDrop,
            JobPayload::Digest(_) => JobKind::Digest,
        }
    }
}

/// A recipient picked during resolution.
///
/// The profile is attached when resolution already loaded it (digest
/// subscribers come from a profile query); otherwise the dispatcher
/// loads it per recipient.
#[derive(Debug, Clone)]
pub struct RecipientCandidate {
    pub user_id: String,
    pub profile: Option<UserProfile>,
}

impl RecipientCandidate {
    pub fn by_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            profile: None,
        }
    }

    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id.clone(),
            profile: Some(profile),
        }
    }
}

/// A unit of fan-out work: one payload, one or more candidate recipients.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub id: Uuid,

    /// Stable identity of the triggering event, for log correlation
    pub dedupe_key: String,

    pub payload: JobPayload,
    pub recipients: Vec<RecipientCandidate>,
    pub created_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn new(
        dedupe_key: String,
        payload: JobPayload,
        recipients: Vec<RecipientCandidate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            dedupe_key,
            payload,
            recipients,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

/// Outcome of one recipient within a job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered { delivery_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DeliveryStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryStatus::Failed { .. })
    }
}

/// One recipient's outcome, as reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientOutcome {
    pub user_id: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Result of dispatching one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub dedupe_key: String,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RecipientOutcome>,
    pub duration_ms: u64,
}

impl JobReport {
    /// Build a report by tallying per-recipient outcomes.
    pub fn from_outcomes(
        job: &NotificationJob,
        outcomes: Vec<RecipientOutcome>,
        duration_ms: u64,
    ) -> Self {
        let delivered = outcomes.iter().filter(|o| o.status.is_delivered()).count();
        let skipped = outcomes.iter().filter(|o| o.status.is_skipped()).count();
        let failed = outcomes.iter().filter(|o| o.status.is_failed()).count();
        Self {
            job_id: job.id,
            kind: job.kind(),
            dedupe_key: job.dedupe_key.clone(),
            delivered,
            skipped,
            failed,
            outcomes,
            duration_ms,
        }
    }

    /// Synthetic report for a recipient that failed before a job could
    /// be dispatched.
    pub fn resolution_failure(
        kind: JobKind,
        dedupe_key: String,
        user_id: String,
        error: String,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            kind,
            dedupe_key,
            delivered: 0,
            skipped: 0,
            failed: 1,
            outcomes: vec![RecipientOutcome {
                user_id,
                status: DeliveryStatus::Failed { error },
            }],
            duration_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_payload() -> JobPayload {
        JobPayload::Message(MessagePayload {
            conversation_id: "c1".to_string(),
            sender_name: Some("Alice".to_string()),
            listing_title: Some("Canoe".to_string()),
            message_text: "Is this still available?".to_string(),
        })
    }

    #[test]
    fn test_payload_kind_mapping() {
        assert_eq!(message_payload().kind(), JobKind::Message);
        assert_eq!(
            JobPayload::Digest(DigestPayload { listings: vec![] }).kind(),
            JobKind::Digest
        );
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(JobKind::Message.as_str(), "message");
        assert_eq!(JobKind::PriceDrop.as_str(), "price_drop");
        assert_eq!(JobKind::Digest.to_string(), "digest");
    }

    #[test]
    fn test_payload_serialization_carries_kind_tag() {
        let json = serde_json::to_value(message_payload()).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["conversation_id"], "c1");
    }

    #[test]
    fn test_outcome_serialization_flattens_status() {
        let outcome = RecipientOutcome {
            user_id: "u1".to_string(),
            status: DeliveryStatus::Skipped {
                reason: "opt_out".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "opt_out");
    }

    #[test]
    fn test_report_tallies_outcomes() {
        let job = NotificationJob::new(
            "message:c1:alice:0".to_string(),
            message_payload(),
            vec![RecipientCandidate::by_id("u1")],
        );
        let outcomes = vec![
            RecipientOutcome {
                user_id: "u1".to_string(),
                status: DeliveryStatus::Delivered {
                    delivery_id: "d1".to_string(),
                },
            },
            RecipientOutcome {
                user_id: "u2".to_string(),
                status: DeliveryStatus::Skipped {
                    reason: "opt_out".to_string(),
                },
            },
            RecipientOutcome {
                user_id: "u3".to_string(),
                status: DeliveryStatus::Failed {
                    error: "mailbox full".to_string(),
                },
            },
        ];

        let report = JobReport::from_outcomes(&job, outcomes, 12);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.kind, JobKind::Message);
        assert_eq!(report.duration_ms, 12);
    }

    #[test]
    fn test_resolution_failure_report() {
        let report = JobReport::resolution_failure(
            JobKind::Digest,
            "digest:u1:2026-08-17".to_string(),
            "u1".to_string(),
            "store unavailable".to_string(),
        );
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.outcomes.len(), 1);
    }
}
