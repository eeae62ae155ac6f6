//! PostgreSQL-backed document store.
//!
//! Reads the tables the marketplace application maintains. Rows are
//! decoded into private row structs and converted into the domain
//! models; notification preferences live in a JSONB column and decode
//! leniently so a malformed blob never fails a lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::backend::{DocumentStore, StoreError};
use super::models::{
    Conversation, Favorite, Listing, ListingRef, ListingStatus, NotificationPreferences,
    UserProfile,
};
use super::pool::StorePool;

/// PostgreSQL implementation of [`DocumentStore`].
pub struct PostgresStore {
    pool: StorePool,
}

impl PostgresStore {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ConversationRow {
    id: String,
    participant_ids: Vec<String>,
    listing_id: Option<String>,
    listing_title: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        let listing = row.listing_id.map(|id| ListingRef {
            id,
            title: row.listing_title,
        });
        Self {
            id: row.id,
            participant_ids: row.participant_ids.into_iter().collect(),
            listing,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    display_name: Option<String>,
    email_notifications: Option<serde_json::Value>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        let email_notifications = row
            .email_notifications
            .map(decode_preferences)
            .unwrap_or_default();
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            email_notifications,
        }
    }
}

/// Decode the JSONB preference blob, treating malformed data as unset.
fn decode_preferences(value: serde_json::Value) -> NotificationPreferences {
    serde_json::from_value(value).unwrap_or_default()
}

#[derive(FromRow)]
struct ListingRow {
    id: String,
    title: String,
    price: f64,
    images: Vec<String>,
    status: String,
    category: Option<String>,
    city: Option<String>,
    province: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            price: row.price,
            images: row.images,
            status: ListingStatus::from(row.status.as_str()),
            category: row.category,
            city: row.city,
            province: row.province,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct FavoriteRow {
    user_id: String,
    listing_id: String,
    created_at: DateTime<Utc>,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self {
            user_id: row.user_id,
            listing_id: row.listing_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, participant_ids, listing_id, listing_title, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(Conversation::from))
    }

    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, display_name, email_notifications
            FROM user_profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn favorites_for_listing(&self, listing_id: &str) -> Result<Vec<Favorite>, StoreError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r#"
            SELECT user_id, listing_id, created_at
            FROM favorites
            WHERE listing_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(listing_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn digest_subscribers(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, display_name, email_notifications
            FROM user_profiles
            WHERE (email_notifications ->> 'weekly_digest')::boolean IS TRUE
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    async fn active_listings_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT id, title, price, images, status, category, city, province, created_at
            FROM listings
            WHERE created_at > $1 AND status = 'active'
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool.pool()).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_row_conversion() {
        let row = ConversationRow {
            id: "c1".to_string(),
            participant_ids: vec!["alice".to_string(), "bob".to_string()],
            listing_id: Some("l1".to_string()),
            listing_title: Some("Canoe".to_string()),
            created_at: Utc::now(),
        };

        let conversation = Conversation::from(row);
        assert_eq!(conversation.participant_ids.len(), 2);
        let listing = conversation.listing.unwrap();
        assert_eq!(listing.id, "l1");
        assert_eq!(listing.title.as_deref(), Some("Canoe"));
    }

    #[test]
    fn test_conversation_row_without_listing() {
        let row = ConversationRow {
            id: "c2".to_string(),
            participant_ids: vec!["alice".to_string()],
            listing_id: None,
            listing_title: None,
            created_at: Utc::now(),
        };

        assert!(Conversation::from(row).listing.is_none());
    }

    #[test]
    fn test_profile_row_decodes_preferences() {
        let row = ProfileRow {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            display_name: None,
            email_notifications: Some(json!({"messages": false, "weekly_digest": true})),
        };

        let profile = UserProfile::from(row);
        assert_eq!(profile.email_notifications.messages, Some(false));
        assert_eq!(profile.email_notifications.weekly_digest, Some(true));
        assert!(profile.email_notifications.price_drops.is_none());
    }

    #[test]
    fn test_malformed_preferences_treated_as_unset() {
        let row = ProfileRow {
            id: "u2".to_string(),
            email: "u2@example.com".to_string(),
            display_name: None,
            email_notifications: Some(json!("not an object")),
        };

        let profile = UserProfile::from(row);
        assert!(profile.email_notifications.messages.is_none());
        assert!(profile.email_notifications.weekly_digest.is_none());
    }

    #[test]
    fn test_listing_row_status_mapping() {
        let row = ListingRow {
            id: "l1".to_string(),
            title: "Snowblower".to_string(),
            price: 400.0,
            images: vec![],
            status: "expired".to_string(),
            category: None,
            city: None,
            province: None,
            created_at: Utc::now(),
        };

        let listing = Listing::from(row);
        assert_eq!(listing.status, ListingStatus::Other);
        assert!(!listing.status.is_active());
    }
}
