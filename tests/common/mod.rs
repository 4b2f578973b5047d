#![allow(dead_code)]

use chrono::{Duration, Utc};
use group_ledger::models::Identity;
use group_ledger::services::LedgerService;
use group_ledger::storage::{LedgerStore, MemoryStore};
use std::sync::Arc;
use uuid::Uuid;

pub fn alice() -> Identity {
    Identity::with_name("U_ALICE", "alice")
}

pub fn bob() -> Identity {
    Identity::with_name("U_BOB", "bob")
}

pub fn carol() -> Identity {
    Identity::with_name("U_CAROL", "carol")
}

/// A service over a fresh in-memory group, plus the store handle for direct inspection.
pub fn setup_service() -> (LedgerService, MemoryStore) {
    let store = MemoryStore::new(format!("T-{}", Uuid::new_v4()));
    let service = LedgerService::new(Arc::new(store.clone()));
    (service, store)
}

/// Moves the stored order's creation time `minutes` into the past.
pub async fn age_open_order(store: &MemoryStore, minutes: i64) {
    let mut order = store
        .get_order()
        .await
        .expect("Failed to load order")
        .expect("No order stored");
    order.date_created = Utc::now() - Duration::minutes(minutes);
    store.update_order(&order).await.expect("Failed to update order");
}

pub fn redis_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}
