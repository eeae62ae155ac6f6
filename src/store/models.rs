//! Marketplace documents read by the notification pipeline.
//!
//! These mirror the documents the marketplace application writes. The
//! pipeline only reads them; nothing here is ever written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A buyer/seller conversation attached to a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation document ID
    pub id: String,

    /// User IDs taking part; a direct conversation has exactly two
    pub participant_ids: SmallVec<[String; 2]>,

    /// Listing the conversation is about, if one is still attached
    pub listing: Option<ListingRef>,

    /// When the conversation was opened
    pub created_at: DateTime<Utc>,
}

/// Minimal listing data denormalized onto a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRef {
    pub id: String,
    pub title: Option<String>,
}

/// Lifecycle state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    /// Any state the pipeline does not distinguish (draft, expired, ...)
    #[serde(other)]
    Other,
}

impl ListingStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ListingStatus::Active)
    }
}

impl From<&str> for ListingStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => ListingStatus::Active,
            "sold" => ListingStatus::Sold,
            _ => ListingStatus::Other,
        }
    }
}

/// A marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Listing document ID
    pub id: String,

    /// Listing title
    pub title: String,

    /// Asking price in dollars
    pub price: f64,

    /// Image URLs, best photo first
    #[serde(default)]
    pub images: Vec<String>,

    /// Lifecycle state
    pub status: ListingStatus,

    /// Category slug
    pub category: Option<String>,

    /// Seller's city
    pub city: Option<String>,

    /// Seller's province
    pub province: Option<String>,

    /// When the listing was posted
    pub created_at: DateTime<Utc>,
}

/// A user's saved listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
}

/// Per-category email opt-in/out flags on a user profile.
///
/// Message and price-drop emails are on unless explicitly turned off;
/// the weekly digest requires an explicit opt-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub messages: Option<bool>,
    pub price_drops: Option<bool>,
    pub weekly_digest: Option<bool>,
}

/// A marketplace user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// User document ID
    pub id: String,

    /// Verified email address
    pub email: String,

    /// Name shown in the UI and in email greetings
    pub display_name: Option<String>,

    /// Email opt-in/out flags; absent means all defaults apply
    #[serde(default)]
    pub email_notifications: NotificationPreferences,
}
