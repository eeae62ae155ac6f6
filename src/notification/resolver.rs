//! Recipient resolution.
//!
//! Turns trigger context into candidate recipients by querying the
//! document store. Failures here are systemic: if the store cannot
//! answer, the trigger has nothing safe to fan out to and aborts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::store::{Conversation, DocumentStore, Listing, StoreError, UserProfile};

/// Store-backed recipient resolution.
pub struct RecipientResolver {
    store: Arc<dyn DocumentStore>,
}

impl RecipientResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fetch the conversation a message belongs to.
    pub async fn conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        self.store.conversation(id).await
    }

    /// The single participant who is not the sender.
    ///
    /// Returns `None` unless exactly one non-sender participant exists.
    /// A conversation with zero or several of them has no unambiguous
    /// recipient and is treated as malformed rather than guessed at.
    pub fn non_sender_participant(conversation: &Conversation, sender_id: &str) -> Option<String> {
        let mut others = conversation
            .participant_ids
            .iter()
            .filter(|id| id.as_str() != sender_id);
        match (others.next(), others.next()) {
            (Some(recipient), None) => Some(recipient.clone()),
            _ => None,
        }
    }

    /// Users who favorited the listing, deduplicated, in first-seen order.
    pub async fn favoriting_users(&self, listing_id: &str) -> Result<Vec<String>, StoreError> {
        let favorites = self.store.favorites_for_listing(listing_id).await?;
        let mut seen = HashSet::new();
        let mut users = Vec::new();
        for favorite in favorites {
            if seen.insert(favorite.user_id.clone()) {
                users.push(favorite.user_id);
            }
        }
        Ok(users)
    }

    /// Profiles that explicitly opted in to the weekly digest.
    pub async fn digest_subscribers(&self) -> Result<Vec<UserProfile>, StoreError> {
        self.store.digest_subscribers().await
    }

    /// Active listings created after `since`, newest first.
    pub async fn listings_for_digest(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        self.store.active_listings_since(since, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Favorite, MemoryStore};
    use smallvec::{smallvec, SmallVec};

    fn conversation(participants: SmallVec<[String; 2]>) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            participant_ids: participants,
            listing: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_party_conversation_resolves_other_side() {
        let conv = conversation(smallvec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(
            RecipientResolver::non_sender_participant(&conv, "alice").as_deref(),
            Some("bob")
        );
        assert_eq!(
            RecipientResolver::non_sender_participant(&conv, "bob").as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_sender_only_conversation_has_no_recipient() {
        let conv = conversation(smallvec!["alice".to_string()]);
        assert!(RecipientResolver::non_sender_participant(&conv, "alice").is_none());
    }

    #[test]
    fn test_group_conversation_is_ambiguous() {
        let conv = conversation(smallvec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string(),
        ]);
        assert!(RecipientResolver::non_sender_participant(&conv, "alice").is_none());
    }

    #[test]
    fn test_sender_outside_participant_list() {
        // A single listed participant is unambiguous even when the
        // sender is not in the list at all
        let conv = conversation(smallvec!["bob".to_string()]);
        assert_eq!(
            RecipientResolver::non_sender_participant(&conv, "mallory").as_deref(),
            Some("bob")
        );

        let conv = conversation(smallvec!["bob".to_string(), "carol".to_string()]);
        assert!(RecipientResolver::non_sender_participant(&conv, "mallory").is_none());
    }

    #[tokio::test]
    async fn test_favoriting_users_dedupe_keeps_first_seen_order() {
        let store = Arc::new(MemoryStore::new());
        for user in ["u2", "u1", "u2", "u3", "u1"] {
            store.insert_favorite(Favorite {
                user_id: user.to_string(),
                listing_id: "l1".to_string(),
                created_at: Utc::now(),
            });
        }

        let resolver = RecipientResolver::new(store);
        let users = resolver.favoriting_users("l1").await.unwrap();
        assert_eq!(users, vec!["u2", "u1", "u3"]);
    }

    #[tokio::test]
    async fn test_no_favorites_resolves_empty() {
        let resolver = RecipientResolver::new(Arc::new(MemoryStore::new()));
        assert!(resolver.favoriting_users("l1").await.unwrap().is_empty());
    }
}
