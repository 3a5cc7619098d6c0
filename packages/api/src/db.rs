// ABOUTME: Database connection management and storage initialization
// ABOUTME: Provides shared access to the SQLite pool and CAP storage for handlers

use std::path::Path;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use cap_records::CapStorage;
use cap_storage::{PoolSettings, StorageError};

/// Shared state for API handlers
#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub cap_storage: Arc<CapStorage>,
    /// User assumed when a request carries no `X-User-Id` header
    pub dev_user: Option<Arc<str>>,
}

impl DbState {
    /// Create new database state from a SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        let cap_storage = Arc::new(CapStorage::new(pool.clone()));

        Self {
            pool,
            cap_storage,
            dev_user: None,
        }
    }

    /// Fall back to `user` for requests without a user header
    pub fn with_dev_user(mut self, user: Option<String>) -> Self {
        self.dev_user = user.map(Arc::from);
        self
    }

    /// Open (or create) the database at `path` and run migrations
    pub async fn init_with_path(
        path: &Path,
        settings: &PoolSettings,
    ) -> Result<Self, StorageError> {
        info!("Initializing database at {}", path.display());

        let pool = cap_storage::connect(path, settings).await?;
        Ok(Self::new(pool))
    }

    /// Fresh in-memory database, used by tests
    pub async fn init_in_memory() -> Result<Self, StorageError> {
        let pool = cap_storage::connect_in_memory().await?;
        Ok(Self::new(pool))
    }
}
