use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::JobReport;

/// Message body inside a message-created trigger
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// User who wrote the message
    pub sender_id: String,
    /// Message text
    pub text: String,
    /// Display name the sender goes by, if the marketplace knows it
    pub sender_name: Option<String>,
    /// When the message was written
    pub created_at: Option<DateTime<Utc>>,
}

/// Trigger payload for a newly created conversation message
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreatedRequest {
    /// Conversation the message belongs to
    pub conversation_id: String,
    /// The message itself
    pub message: InboundMessage,
}

/// Listing fields carried by a listing-updated trigger.
///
/// The trigger is evaluated against these snapshots alone; the listing
/// document is never re-read, so a concurrent edit cannot make the email
/// disagree with the change that fired the trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingSnapshot {
    /// Asking price in dollars
    pub price: f64,
    /// Listing title
    pub title: Option<String>,
    /// Listing photo URLs, first one is the cover image
    #[serde(default)]
    pub images: Vec<String>,
}

/// Trigger payload for a listing update
#[derive(Debug, Clone, Deserialize)]
pub struct ListingUpdatedRequest {
    /// Listing document ID
    pub listing_id: String,
    /// Listing fields before the update
    pub before: ListingSnapshot,
    /// Listing fields after the update
    pub after: ListingSnapshot,
}

/// Why a trigger ended without dispatching any jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ConversationNotFound,
    NoUniqueRecipient,
    PriceNotDropped,
    DropBelowThreshold,
    NoFavorites,
    NoDigestSubscribers,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ConversationNotFound => "conversation_not_found",
            SkipReason::NoUniqueRecipient => "no_unique_recipient",
            SkipReason::PriceNotDropped => "price_not_dropped",
            SkipReason::DropBelowThreshold => "drop_below_threshold",
            SkipReason::NoFavorites => "no_favorites",
            SkipReason::NoDigestSubscribers => "no_digest_subscribers",
        }
    }
}

/// What a trigger did with the event it received.
///
/// Skips are successful outcomes. A precondition that does not hold is
/// the normal case for most invocations, not an error.
#[derive(Debug)]
pub enum TriggerReport {
    /// The event did not warrant any notifications
    Skipped(SkipReason),
    /// Jobs were dispatched, one report per job
    Completed(Vec<JobReport>),
}

/// Response for trigger endpoints
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// Trigger that handled the request
    pub trigger: &'static str,
    /// "completed" or "skipped"
    pub outcome: &'static str,
    /// Why the trigger skipped, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Dispatch reports, one per job
    pub jobs: Vec<JobReport>,
    /// Timestamp of the operation
    pub timestamp: DateTime<Utc>,
}

impl TriggerResponse {
    pub fn from_report(trigger: &'static str, report: TriggerReport) -> Self {
        match report {
            TriggerReport::Skipped(reason) => Self {
                trigger,
                outcome: "skipped",
                reason: Some(reason.as_str()),
                jobs: Vec::new(),
                timestamp: Utc::now(),
            },
            TriggerReport::Completed(jobs) => Self {
                trigger,
                outcome: "completed",
                reason: None,
                jobs,
                timestamp: Utc::now(),
            },
        }
    }
}
