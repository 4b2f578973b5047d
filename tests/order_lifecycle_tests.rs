mod common;

use common::{age_open_order, alice, bob, carol, setup_service};
use group_ledger::models::Identity;
use group_ledger::services::{LedgerPolicy, LedgerService};
use group_ledger::storage::{LedgerStore, MemoryStore};
use group_ledger::AppError;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_open_new_order() {
    let (service, _store) = setup_service();

    let order = service.open_new_order(alice()).await.expect("Failed to open order");
    assert!(order.is_open());
    assert_eq!(order.owner, alice());
    assert!(order.costs.is_empty());
    assert_eq!(order.shared_cost, Decimal::ZERO);

    let current = service
        .get_open_order()
        .await
        .expect("Failed to get order")
        .expect("Order missing");
    assert_eq!(current.id, order.id);
}

#[tokio::test]
async fn test_only_one_open_order() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.expect("Failed to open order");

    let err = service.open_new_order(bob()).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "There is already an open order. Cancel it first.");
}

#[tokio::test]
async fn test_get_open_order_without_order() {
    let (service, _store) = setup_service();
    assert!(service.get_open_order().await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_eater_requires_open_order() {
    let (service, _store) = setup_service();

    let err = service.add_eater(bob(), dec!(10), None).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "There is no order open.");

    let err = service.set_shared_cost(dec!(3)).await.unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_closed_order_cannot_be_altered() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.finish_order().await.unwrap();

    let err = service.add_eater(bob(), dec!(1), None).await.unwrap_err();
    assert_eq!(err.to_string(), "Order is closed and cannot be altered.");

    let err = service.set_shared_cost(dec!(1)).await.unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_add_eater_sets_and_replaces_cost() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();

    service
        .add_eater(bob(), dec!(10.00), Some("pizza".to_string()))
        .await
        .unwrap();
    let order = service.add_eater(bob(), dec!(12.50), None).await.unwrap();

    assert_eq!(order.participant_count(), 1);
    assert_eq!(order.costs["U_BOB"].value, dec!(12.50));
    assert_eq!(order.costs["U_BOB"].item, None);
}

#[tokio::test]
async fn test_zero_cost_removes_eater() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();

    service
        .add_eater(bob(), dec!(10.00), Some("x".to_string()))
        .await
        .unwrap();
    let order = service.add_eater(bob(), Decimal::ZERO, None).await.unwrap();

    assert!(!order.costs.contains_key("U_BOB"));

    let stored = service.get_open_order().await.unwrap().unwrap();
    assert!(stored.costs.is_empty());
}

#[tokio::test]
async fn test_set_shared_cost_overwrites() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();

    service.set_shared_cost(dec!(3)).await.unwrap();
    let order = service.set_shared_cost(dec!(4.99)).await.unwrap();

    assert_eq!(order.shared_cost, dec!(4.99));
}

#[tokio::test]
async fn test_finish_order_splits_shared_cost() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service
        .add_eater(bob(), dec!(10.00), Some("pizza".to_string()))
        .await
        .unwrap();
    service.add_eater(carol(), dec!(5.00), None).await.unwrap();
    service.set_shared_cost(dec!(3.00)).await.unwrap();

    let settlement = service.finish_order().await.expect("Failed to finish order");

    assert!(!settlement.order.is_open());
    assert!(settlement.order.date_closed.is_some());
    assert_eq!(settlement.order.total_cost(), dec!(18.00));

    let book = &settlement.balance_book;
    let alice_bob = book.balance_between(&alice(), &bob()).unwrap();
    let bob_debt = alice_bob.get_debt();
    assert_eq!(bob_debt.debtor, bob());
    assert_eq!(bob_debt.amount, dec!(11.50));

    let alice_carol = book.balance_between(&alice(), &carol()).unwrap();
    let carol_debt = alice_carol.get_debt();
    assert_eq!(carol_debt.debtor, carol());
    assert_eq!(carol_debt.amount, dec!(6.50));

    // Persisted as well
    let stored = service.get_balance_book().await.unwrap();
    assert_eq!(stored.total_owed_by(&bob()), dec!(11.50));
    assert!(!service.get_open_order().await.unwrap().unwrap().is_open());
}

#[tokio::test]
async fn test_finish_order_counts_owner_line_in_split() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service.add_eater(alice(), dec!(8), None).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.set_shared_cost(dec!(6)).await.unwrap();

    let settlement = service.finish_order().await.unwrap();

    // shared part 6 / 2 = 3, owner's own line posts nothing
    let book = &settlement.balance_book;
    assert_eq!(book.balances.len(), 1);
    assert_eq!(book.total_owed_by(&bob()), dec!(13));
    assert_eq!(book.total_owed_by(&alice()), Decimal::ZERO);
}

#[tokio::test]
async fn test_finish_order_requires_two_participants() {
    let (service, _store) = setup_service();

    let err = service.finish_order().await.unwrap_err();
    assert!(err.is_bad_request());

    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();

    let err = service.finish_order().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Order needs to have at least 2 participants to be completed."
    );
    assert!(service.get_balance_book().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finish_order_twice_fails() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.finish_order().await.unwrap();

    let err = service.finish_order().await.unwrap_err();
    assert_eq!(err.to_string(), "This order has already been finalized.");

    // Second attempt posted nothing
    let book = service.get_balance_book().await.unwrap();
    assert_eq!(book.total_owed_by(&bob()), dec!(10));
}

#[tokio::test]
async fn test_reopen_reverts_finish() {
    let (service, _store) = setup_service();
    service.owe_credit(&bob(), &alice(), dec!(2.25)).await.unwrap();
    service.owe_credit(&alice(), &carol(), dec!(1)).await.unwrap();
    let before = service.get_balance_book().await.unwrap();

    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.set_shared_cost(dec!(10)).await.unwrap();
    service.finish_order().await.unwrap();

    let settlement = service.reopen_order().await.expect("Failed to reopen");
    assert!(settlement.order.is_open());
    assert_eq!(settlement.order.costs.len(), 2);

    for (key, pair) in &settlement.balance_book.balances {
        let original = before
            .balances
            .get(key)
            .map(|p| p.balance)
            .unwrap_or(Decimal::ZERO);
        assert_eq!(pair.balance, original, "pair {} not restored", key);
    }
}

#[tokio::test]
async fn test_reopen_uneven_split_restores_exactly() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(1), None).await.unwrap();
    service.add_eater(carol(), dec!(1), None).await.unwrap();
    service.add_eater(Identity::new("U_DAVE"), dec!(1), None).await.unwrap();
    service.set_shared_cost(dec!(10)).await.unwrap();

    service.finish_order().await.unwrap();
    let settlement = service.reopen_order().await.unwrap();

    assert!(settlement
        .balance_book
        .balances
        .values()
        .all(|pair| pair.is_settled()));
    assert!(settlement.balance_book.find_biggest_debtor().is_none());
}

#[tokio::test]
async fn test_reopen_requires_closed_order() {
    let (service, _store) = setup_service();

    let err = service.reopen_order().await.unwrap_err();
    assert_eq!(err.to_string(), "There is no valid order to reopen.");

    service.open_new_order(alice()).await.unwrap();
    let err = service.reopen_order().await.unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_reopened_order_can_be_finished_again() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.finish_order().await.unwrap();
    service.reopen_order().await.unwrap();

    service.add_eater(bob(), dec!(20), None).await.unwrap();
    let settlement = service.finish_order().await.unwrap();

    assert_eq!(settlement.balance_book.total_owed_by(&bob()), dec!(20));
    assert_eq!(settlement.balance_book.total_owed_by(&carol()), dec!(5));
}

#[tokio::test]
async fn test_new_order_replaces_closed_order() {
    let (service, _store) = setup_service();
    let first = service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.finish_order().await.unwrap();

    let second = service.open_new_order(bob()).await.unwrap();
    assert_ne!(first.id, second.id);

    // The closed order is gone, so it can no longer be reopened
    let err = service.reopen_order().await.unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_owner_can_cancel_immediately() {
    let (service, _store) = setup_service();
    service.open_new_order(alice()).await.unwrap();

    service.cancel_open_order(&alice()).await.expect("Owner cancel failed");
    assert!(service.get_open_order().await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_owner_cancel_respects_cooldown() {
    let (service, store) = setup_service();
    service.open_new_order(alice()).await.unwrap();

    age_open_order(&store, 5).await;
    let err = service.cancel_open_order(&bob()).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(
        err.to_string(),
        "Only order owner can cancel the order during first 30 minutes."
    );
    assert!(service.get_open_order().await.unwrap().is_some());

    age_open_order(&store, 31).await;
    service.cancel_open_order(&bob()).await.expect("Cancel after cooldown failed");
    assert!(service.get_open_order().await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_requires_open_order() {
    let (service, _store) = setup_service();

    let err = service.cancel_open_order(&alice()).await.unwrap_err();
    assert_eq!(err.to_string(), "There is no valid order to cancel.");

    service.open_new_order(alice()).await.unwrap();
    service.add_eater(bob(), dec!(10), None).await.unwrap();
    service.add_eater(carol(), dec!(5), None).await.unwrap();
    service.finish_order().await.unwrap();

    let err = service.cancel_open_order(&alice()).await.unwrap_err();
    assert!(err.is_bad_request());
    assert!(service.get_open_order().await.unwrap().is_some());
}

#[tokio::test]
async fn test_custom_cancel_cooldown() {
    let store = MemoryStore::new("T-cooldown");
    let service = LedgerService::with_policy(
        Arc::new(store.clone()),
        LedgerPolicy {
            cancel_cooldown: Duration::minutes(2),
        },
    );
    service.open_new_order(alice()).await.unwrap();

    age_open_order(&store, 3).await;
    service.cancel_open_order(&bob()).await.expect("Cancel failed");
}

#[tokio::test]
async fn test_groups_do_not_share_orders() {
    let store = MemoryStore::new("T-one");
    let first = LedgerService::new(Arc::new(store.clone()));
    let second = LedgerService::new(Arc::new(store.for_group("T-two")));

    first.open_new_order(alice()).await.unwrap();
    second.open_new_order(bob()).await.expect("Second group blocked by first");

    assert!(matches!(
        first.open_new_order(carol()).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(
        store.get_order().await.unwrap().unwrap().owner,
        alice()
    );
}
