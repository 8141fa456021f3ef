pub mod memory;
pub mod pool;
pub mod queries;
pub mod store;

pub use memory::MemoryStore;
pub use pool::create_pool;
pub use store::{PgStore, ReconcileStore};

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// In-process store for `memory://` URLs, otherwise a Postgres pool
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn ReconcileStore>> {
    if config.is_memory() {
        tracing::info!("Using in-memory store, nothing is persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let pool = create_pool(config).await?;
    tracing::info!("Database pool created");
    Ok(Arc::new(PgStore::new(pool)))
}
