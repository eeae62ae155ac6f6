//! Notification jobs, recipient gating, and fan-out dispatch.
//!
//! A trigger builds a [`NotificationJob`] describing what happened and who
//! might care, then hands it to the [`FanOutDispatcher`]. The dispatcher
//! walks the recipients with bounded concurrency and records one
//! [`RecipientOutcome`] per candidate, so a single bad address or missing
//! profile never blocks the rest of the fan-out.

mod dispatcher;
mod gate;
mod job;
mod resolver;

pub(crate) use dispatcher::join_all_bounded;
pub use dispatcher::{DispatcherStatsSnapshot, FanOutDispatcher};
pub use gate::{preference_allows, PriceChangeDecision, PriceDropRule};
pub use job::{
    DeliveryStatus, DigestListing, DigestPayload, JobKind, JobPayload, JobReport, MessagePayload,
    NotificationJob, PriceDropPayload, RecipientCandidate, RecipientOutcome,
};
pub use resolver::RecipientResolver;
