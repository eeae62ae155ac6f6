//! In-memory document store.
//!
//! Backs local development and tests. Documents are seeded through the
//! `insert_*` methods and served from `DashMap`s; `set_available(false)`
//! simulates a store outage so failure paths can be exercised.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::backend::{DocumentStore, StoreError};
use super::models::{Conversation, Favorite, Listing, UserProfile};

/// In-memory implementation of [`DocumentStore`].
pub struct MemoryStore {
    conversations: DashMap<String, Conversation>,
    profiles: DashMap<String, UserProfile>,
    /// Favorites grouped by listing ID, in insertion order
    favorites: DashMap<String, Vec<Favorite>>,
    listings: DashMap<String, Listing>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            profiles: DashMap::new(),
            favorites: DashMap::new(),
            listings: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn insert_favorite(&self, favorite: Favorite) {
        self.favorites
            .entry(favorite.listing_id.clone())
            .or_default()
            .push(favorite);
    }

    pub fn insert_listing(&self, listing: Listing) {
        self.listings.insert(listing.id.clone(), listing);
    }

    /// Toggle availability; when false every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory store marked unavailable".to_string(),
            ))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        self.check_available()?;
        Ok(self.conversations.get(id).map(|entry| entry.clone()))
    }

    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.check_available()?;
        Ok(self.profiles.get(id).map(|entry| entry.clone()))
    }

    async fn favorites_for_listing(&self, listing_id: &str) -> Result<Vec<Favorite>, StoreError> {
        self.check_available()?;
        Ok(self
            .favorites
            .get(listing_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn digest_subscribers(&self) -> Result<Vec<UserProfile>, StoreError> {
        self.check_available()?;
        Ok(self
            .profiles
            .iter()
            .filter(|entry| entry.email_notifications.weekly_digest == Some(true))
            .map(|entry| entry.clone())
            .collect())
    }

    async fn active_listings_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        self.check_available()?;
        let mut listings: Vec<Listing> = self
            .listings
            .iter()
            .filter(|entry| entry.status.is_active() && entry.created_at > since)
            .map(|entry| entry.clone())
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listings.truncate(limit.max(0) as usize);
        Ok(listings)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{ListingStatus, NotificationPreferences};
    use chrono::Duration;
    use smallvec::smallvec;

    fn profile(id: &str, weekly_digest: Option<bool>) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: Some(id.to_uppercase()),
            email_notifications: NotificationPreferences {
                messages: None,
                price_drops: None,
                weekly_digest,
            },
        }
    }

    fn listing(id: &str, status: ListingStatus, age_days: i64) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Listing {id}"),
            price: 100.0,
            images: vec![],
            status,
            category: None,
            city: Some("Toronto".to_string()),
            province: Some("ON".to_string()),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_conversation_round_trip() {
        let store = MemoryStore::new();
        store.insert_conversation(Conversation {
            id: "c1".to_string(),
            participant_ids: smallvec!["alice".to_string(), "bob".to_string()],
            listing: None,
            created_at: Utc::now(),
        });

        let found = store.conversation("c1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().participant_ids.len(), 2);

        let missing = store.conversation("c2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_favorites_preserve_insertion_order() {
        let store = MemoryStore::new();
        for user in ["u1", "u2", "u3"] {
            store.insert_favorite(Favorite {
                user_id: user.to_string(),
                listing_id: "l1".to_string(),
                created_at: Utc::now(),
            });
        }

        let favorites = store.favorites_for_listing("l1").await.unwrap();
        let users: Vec<&str> = favorites.iter().map(|f| f.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2", "u3"]);

        assert!(store.favorites_for_listing("l2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_subscribers_require_explicit_opt_in() {
        let store = MemoryStore::new();
        store.insert_profile(profile("opted-in", Some(true)));
        store.insert_profile(profile("opted-out", Some(false)));
        store.insert_profile(profile("unset", None));

        let subscribers = store.digest_subscribers().await.unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].id, "opted-in");
    }

    #[tokio::test]
    async fn test_active_listings_window_and_limit() {
        let store = MemoryStore::new();
        store.insert_listing(listing("fresh", ListingStatus::Active, 1));
        store.insert_listing(listing("older", ListingStatus::Active, 3));
        store.insert_listing(listing("stale", ListingStatus::Active, 10));
        store.insert_listing(listing("sold", ListingStatus::Sold, 1));

        let since = Utc::now() - Duration::days(7);
        let listings = store.active_listings_since(since, 10).await.unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        // Newest first, stale and sold excluded
        assert_eq!(ids, vec!["fresh", "older"]);

        let limited = store.active_listings_since(since, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "fresh");
    }

    #[tokio::test]
    async fn test_window_lower_bound_is_exclusive() {
        let store = MemoryStore::new();
        let since = Utc::now() - Duration::days(7);

        let mut just_inside = listing("inside", ListingStatus::Active, 0);
        just_inside.created_at = since + Duration::seconds(1);
        let mut just_outside = listing("outside", ListingStatus::Active, 0);
        just_outside.created_at = since - Duration::seconds(1);
        let mut on_boundary = listing("boundary", ListingStatus::Active, 0);
        on_boundary.created_at = since;
        store.insert_listing(just_inside);
        store.insert_listing(just_outside);
        store.insert_listing(on_boundary);

        let listings = store.active_listings_since(since, 10).await.unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["inside"]);
    }

    #[tokio::test]
    async fn test_outage_fails_every_operation() {
        let store = MemoryStore::new();
        store.insert_profile(profile("u1", None));

        store.set_available(false);
        assert!(store.user_profile("u1").await.is_err());
        assert!(store.ping().await.is_err());

        store.set_available(true);
        assert!(store.user_profile("u1").await.unwrap().is_some());
        assert!(store.ping().await.is_ok());
    }
}
