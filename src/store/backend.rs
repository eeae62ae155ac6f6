//! Backend trait for the marketplace document store.
//!
//! This module defines the abstraction layer over the marketplace data,
//! allowing different storage implementations (memory, PostgreSQL) to be
//! used interchangeably.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{Conversation, Favorite, Listing, UserProfile};

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the marketplace documents.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (`Send + Sync`) as they will be
/// shared across concurrent recipient deliveries.
///
/// # Error Handling
///
/// All operations return `Result<T, StoreError>`. A missing document is
/// `Ok(None)`, never an error; errors mean the lookup itself failed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a conversation by ID.
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError>;

    /// Fetch a user profile by ID.
    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// List every favorite pointing at the given listing.
    ///
    /// Returned in the order the favorites were created. One user may
    /// appear more than once if the marketplace wrote duplicate rows.
    async fn favorites_for_listing(&self, listing_id: &str) -> Result<Vec<Favorite>, StoreError>;

    /// List profiles that explicitly opted in to the weekly digest.
    ///
    /// A profile with no `weekly_digest` flag is not a subscriber.
    async fn digest_subscribers(&self) -> Result<Vec<UserProfile>, StoreError>;

    /// List active listings created strictly after `since`, newest first.
    ///
    /// # Arguments
    ///
    /// * `since` - Exclusive lower bound on creation time
    /// * `limit` - Maximum number of listings to return
    async fn active_listings_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError>;

    /// Cheap liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend type identifier for logs and health reporting.
    fn backend_name(&self) -> &'static str;
}
