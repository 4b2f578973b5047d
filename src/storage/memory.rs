use crate::error::{AppError, Result};
use crate::models::{BalanceBook, Order};
use crate::storage::LedgerStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Documents {
    orders: HashMap<String, Order>,
    books: HashMap<String, BalanceBook>,
}

/// In-process store. Handles created with `for_group` share the same documents.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    group_id: String,
    documents: Arc<RwLock<Documents>>,
}

impl MemoryStore {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            documents: Arc::new(RwLock::new(Documents::default())),
        }
    }

    /// Returns a handle for another group backed by the same documents.
    pub fn for_group(&self, group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            documents: Arc::clone(&self.documents),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.orders.insert(self.group_id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self) -> Result<Option<Order>> {
        let documents = self.documents.read().await;
        Ok(documents.orders.get(&self.group_id).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut documents = self.documents.write().await;
        match documents.orders.get_mut(&self.group_id) {
            Some(stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(AppError::InvalidState(format!(
                "No order stored for group '{}'",
                self.group_id
            ))),
        }
    }

    async fn delete_order(&self) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.orders.remove(&self.group_id);
        Ok(())
    }

    async fn get_balance_book(&self) -> Result<BalanceBook> {
        let mut documents = self.documents.write().await;
        Ok(documents
            .books
            .entry(self.group_id.clone())
            .or_default()
            .clone())
    }

    async fn upsert_balance_book(&self, book: &BalanceBook) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.books.insert(self.group_id.clone(), book.clone());
        Ok(())
    }
}
