//! Marketplace document store.
//!
//! The pipeline reads conversations, listings, favorites and user
//! profiles through the [`DocumentStore`] trait. Two backends exist: an
//! in-memory store for development and tests, and a PostgreSQL store for
//! production.

mod backend;
mod factory;
mod memory;
mod models;
mod pool;
mod postgres;

pub use backend::{DocumentStore, StoreError};
pub use factory::create_store;
pub use memory::MemoryStore;
pub use models::{
    Conversation, Favorite, Listing, ListingRef, ListingStatus, NotificationPreferences,
    UserProfile,
};
pub use pool::StorePool;
pub use postgres::PostgresStore;
