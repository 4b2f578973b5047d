pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::config::{StorageBackend, StorageSettings};
use crate::error::Result;
use crate::models::{BalanceBook, Order};
use async_trait::async_trait;
use std::sync::Arc;

/// Document storage for one group: its current order and its balance book.
///
/// Implementations are bound to a single group at construction. Writes replace
/// whole documents; serializing concurrent writers is up to the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Stores `order` as the group's current order, replacing any previous one.
    async fn create_order(&self, order: &Order) -> Result<()>;

    async fn get_order(&self) -> Result<Option<Order>>;

    /// Replaces the stored order. Fails if the group has no order.
    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Removes the group's order. Missing orders are ignored.
    async fn delete_order(&self) -> Result<()>;

    /// Returns the group's balance book, creating an empty one on first access.
    async fn get_balance_book(&self) -> Result<BalanceBook>;

    async fn upsert_balance_book(&self, book: &BalanceBook) -> Result<()>;
}

/// Builds the store configured in `settings` for `group_id`.
pub fn build_store(settings: &StorageSettings, group_id: &str) -> Result<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new(group_id)),
        StorageBackend::Redis => {
            let client = redis::Client::open(settings.redis_url.as_str())?;
            Arc::new(RedisStore::new(client, &settings.key_prefix, group_id))
        }
    };
    tracing::debug!(backend = ?settings.backend, group = group_id, "Ledger store ready");
    Ok(store)
}

/// Key of the order document of a group.
pub fn order_key(prefix: &str, group_id: &str) -> String {
    format!("{}:order:{}", prefix, group_id)
}

/// Key of the balance book document of a group.
pub fn balance_book_key(prefix: &str, group_id: &str) -> String {
    format!("{}:balance:{}", prefix, group_id)
}
