use crate::error::{AppError, Result};
use crate::models::{BalanceBook, Order};
use crate::observability::{get_metrics, LatencyTimer};
use crate::storage::{balance_book_key, order_key, LedgerStore};
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// How a document write treats an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Upsert,
    /// `SET .. XX`: only replace an existing document.
    ReplaceExisting,
    /// `SET .. NX`: only create a missing document.
    CreateMissing,
}

/// Redis-backed store. Each document is a JSON string under a per-group key.
pub struct RedisStore {
    client: redis::Client,
    order_key: String,
    balance_book_key: String,
}

impl RedisStore {
    pub fn new(client: redis::Client, key_prefix: &str, group_id: &str) -> Self {
        Self {
            client,
            order_key: order_key(key_prefix, group_id),
            balance_book_key: balance_book_key(key_prefix, group_id),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::warn!("Redis connection error: {}", e);
                AppError::Redis(e)
            })
    }

    async fn read_document<T: DeserializeOwned + Send>(&self, key: &str, operation: &str) -> Result<Option<T>> {
        let timer = LatencyTimer::new();
        let mut conn = self.connection().await?;

        let raw: Option<String> = match conn.get(key).await {
            Ok(v) => v,
            Err(e) => {
                get_metrics().record_storage_operation(operation, timer.elapsed_ms(), false);
                tracing::warn!("Redis get error for key {}: {}", key, e);
                return Err(AppError::Redis(e));
            }
        };
        get_metrics().record_storage_operation(operation, timer.elapsed_ms(), true);

        raw.map(|json| serde_json::from_str::<T>(&json))
            .transpose()
            .map_err(AppError::Serialization)
    }

    /// Writes `value` under `key`; returns false if `mode` prevented the write.
    async fn write_document<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        mode: WriteMode,
        operation: &str,
    ) -> Result<bool> {
        let json = serde_json::to_string(value)?;
        let timer = LatencyTimer::new();
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(json);
        match mode {
            WriteMode::Upsert => {}
            WriteMode::ReplaceExisting => {
                cmd.arg("XX");
            }
            WriteMode::CreateMissing => {
                cmd.arg("NX");
            }
        }

        match cmd.query_async::<_, Option<String>>(&mut conn).await {
            Ok(reply) => {
                get_metrics().record_storage_operation(operation, timer.elapsed_ms(), true);
                tracing::debug!(key = key, written = reply.is_some(), "Stored document");
                Ok(reply.is_some())
            }
            Err(e) => {
                get_metrics().record_storage_operation(operation, timer.elapsed_ms(), false);
                tracing::warn!("Redis set error for key {}: {}", key, e);
                Err(AppError::Redis(e))
            }
        }
    }
}

#[async_trait]
impl LedgerStore for RedisStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        self.write_document(&self.order_key, order, WriteMode::Upsert, "create_order")
            .await?;
        Ok(())
    }

    async fn get_order(&self) -> Result<Option<Order>> {
        self.read_document(&self.order_key, "get_order").await
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let written = self
            .write_document(&self.order_key, order, WriteMode::ReplaceExisting, "update_order")
            .await?;
        if !written {
            return Err(AppError::InvalidState(format!(
                "No order stored under '{}'",
                self.order_key
            )));
        }
        Ok(())
    }

    async fn delete_order(&self) -> Result<()> {
        let timer = LatencyTimer::new();
        let mut conn = self.connection().await?;

        let result = conn.del::<_, ()>(&self.order_key).await;
        get_metrics().record_storage_operation("delete_order", timer.elapsed_ms(), result.is_ok());
        result.map_err(|e| {
            tracing::warn!("Redis del error for key {}: {}", self.order_key, e);
            AppError::Redis(e)
        })
    }

    async fn get_balance_book(&self) -> Result<BalanceBook> {
        if let Some(book) = self
            .read_document(&self.balance_book_key, "get_balance_book")
            .await?
        {
            return Ok(book);
        }

        let book = BalanceBook::new();
        let created = self
            .write_document(&self.balance_book_key, &book, WriteMode::CreateMissing, "create_balance_book")
            .await?;
        if created {
            tracing::info!(key = %self.balance_book_key, "Created empty balance book");
            return Ok(book);
        }

        // Another writer created the book between our read and write.
        self.read_document(&self.balance_book_key, "get_balance_book")
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Balance book under '{}' disappeared",
                    self.balance_book_key
                ))
            })
    }

    async fn upsert_balance_book(&self, book: &BalanceBook) -> Result<()> {
        self.write_document(&self.balance_book_key, book, WriteMode::Upsert, "upsert_balance_book")
            .await?;
        Ok(())
    }
}
