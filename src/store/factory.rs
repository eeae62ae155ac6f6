//! Document store factory

use std::sync::Arc;

use crate::config::StoreConfig;

use super::backend::{DocumentStore, StoreError};
use super::memory::MemoryStore;
use super::pool::StorePool;
use super::postgres::PostgresStore;

/// Create a document store based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend`
/// setting:
/// - `"postgres"`: Connects a pool and returns a `PostgresStore`; a
///   connection failure is returned to the caller rather than silently
///   falling back
/// - `"memory"` (default): Returns an empty `MemoryStore`
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend.as_str() {
        "postgres" | "postgresql" => {
            let pool = StorePool::new(&config.database).await?;
            tracing::info!(
                backend = "postgres",
                url = %pool.database_url_masked(),
                "Creating PostgreSQL document store"
            );
            Ok(Arc::new(PostgresStore::new(pool)))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown store backend, falling back to memory"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn test_memory_backend_selected_by_default() {
        let config = StoreConfig::default();
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unknown_backend_falls_back_to_memory() {
        let config = StoreConfig {
            backend: "mongodb".to_string(),
            ..StoreConfig::default()
        };
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
