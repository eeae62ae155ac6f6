mod digest;
mod listing;
mod message;
mod models;

pub use digest::{process_weekly_digest, weekly_digest};
pub use listing::{listing_updated, process_listing_updated};
pub use message::{message_created, process_message_created};
pub use models::{
    InboundMessage, ListingSnapshot, ListingUpdatedRequest, MessageCreatedRequest, SkipReason,
    TriggerReport, TriggerResponse,
};
