use crate::config::LedgerSettings;
use crate::error::{AppError, Result};
use crate::models::{BalanceBook, BiggestDebtor, Identity, Order, PairBalance};
use crate::observability::{get_metrics, mask_amount, mask_sensitive};
use crate::storage::LedgerStore;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rules the service enforces beyond the data model invariants.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    /// Time after creation during which only the owner may cancel an order.
    pub cancel_cooldown: Duration,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            cancel_cooldown: Duration::minutes(30),
        }
    }
}

impl TryFrom<&LedgerSettings> for LedgerPolicy {
    type Error = AppError;

    fn try_from(settings: &LedgerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            cancel_cooldown: Duration::minutes(settings.cancel_cooldown_minutes),
        })
    }
}

/// An order together with the balance book it was just settled into (or reverted from).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettlement {
    pub order: Order,
    pub balance_book: BalanceBook,
}

/// Order lifecycle and debt bookkeeping for one group.
///
/// Every operation loads the documents it needs, mutates them in memory and
/// persists them before returning. A failure before the final write leaves
/// storage unchanged.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_policy(store, LedgerPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Opens a new order hosted by `owner`. A closed order, if any, is replaced.
    pub async fn open_new_order(&self, owner: Identity) -> Result<Order> {
        if let Some(current) = self.store.get_order().await? {
            if current.is_open() {
                return Err(reject(
                    "open_new_order",
                    "There is already an open order. Cancel it first.",
                ));
            }
        }

        let order = Order::new(owner);
        self.store.create_order(&order).await?;

        get_metrics().record_order_opened();
        info!(order_id = %order.id, owner = %masked(&order.owner), "Order opened");
        Ok(order)
    }

    /// Returns the group's current order, open or closed.
    pub async fn get_open_order(&self) -> Result<Option<Order>> {
        self.store.get_order().await
    }

    /// Sets `eater`'s cost line. A zero `cost` removes the line.
    pub async fn add_eater(
        &self,
        eater: Identity,
        cost: Decimal,
        item: Option<String>,
    ) -> Result<Order> {
        let mut order = self.load_open_order("add_eater").await?;

        order.set_cost(&eater, cost, item);
        self.store.update_order(&order).await?;

        debug!(
            order_id = %order.id,
            eater = %masked(&eater),
            cost = %mask_amount(&cost),
            "Cost line updated"
        );
        Ok(order)
    }

    /// Overwrites the cost shared by all cost lines.
    pub async fn set_shared_cost(&self, value: Decimal) -> Result<Order> {
        let mut order = self.load_open_order("set_shared_cost").await?;

        order.shared_cost = value;
        self.store.update_order(&order).await?;

        debug!(order_id = %order.id, "Shared cost updated");
        Ok(order)
    }

    /// Deletes the open order. Non-owners must wait out the cancel cooldown.
    pub async fn cancel_open_order(&self, caller: &Identity) -> Result<()> {
        let order = match self.store.get_order().await? {
            Some(order) if order.is_open() => order,
            _ => return Err(reject("cancel_open_order", "There is no valid order to cancel.")),
        };

        let by_owner = order.is_owned_by(caller);
        if !by_owner && Utc::now() - order.date_created < self.policy.cancel_cooldown {
            return Err(reject(
                "cancel_open_order",
                format!(
                    "Only order owner can cancel the order during first {} minutes.",
                    self.policy.cancel_cooldown.num_minutes()
                ),
            ));
        }

        self.store.delete_order().await?;

        get_metrics().record_order_cancelled(by_owner);
        info!(order_id = %order.id, caller = %masked(caller), "Order cancelled");
        Ok(())
    }

    /// Closes the open order and posts every non-owner line as debt to the owner.
    ///
    /// The shared cost is split evenly over all cost lines, the owner's included.
    pub async fn finish_order(&self) -> Result<OrderSettlement> {
        let mut order = match self.store.get_order().await? {
            Some(order) => order,
            None => return Err(reject("finish_order", "There is no order open.")),
        };

        if order.participant_count() < 2 {
            return Err(reject(
                "finish_order",
                "Order needs to have at least 2 participants to be completed.",
            ));
        }

        if !order.is_open() {
            return Err(reject("finish_order", "This order has already been finalized."));
        }

        let mut book = self.store.get_balance_book().await?;
        for (eater, amount) in order.owner_claims() {
            book.add_debt(&eater, &order.owner, amount)?;
            get_metrics().record_debt_posted("finish_order");
            debug!(order_id = %order.id, eater = %masked(&eater), "Posted order debt");
        }

        order.close();

        self.store.upsert_balance_book(&book).await?;
        self.store.update_order(&order).await?;

        get_metrics().record_order_finished(order.participant_count(), order.total_cost());
        info!(
            order_id = %order.id,
            participants = order.participant_count(),
            "Order finished"
        );

        Ok(OrderSettlement {
            order,
            balance_book: book,
        })
    }

    /// Reopens the closed order and reverses the debts its completion posted.
    pub async fn reopen_order(&self) -> Result<OrderSettlement> {
        let mut order = match self.store.get_order().await? {
            Some(order) if !order.is_open() => order,
            _ => return Err(reject("reopen_order", "There is no valid order to reopen.")),
        };

        let mut book = self.store.get_balance_book().await?;
        for (eater, amount) in order.owner_claims() {
            book.add_debt(&order.owner, &eater, amount)?;
            get_metrics().record_debt_posted("reopen_order");
        }

        order.reopen();

        self.store.update_order(&order).await?;
        self.store.upsert_balance_book(&book).await?;

        get_metrics().record_order_reopened();
        info!(order_id = %order.id, "Order reopened, order debts reverted");

        Ok(OrderSettlement {
            order,
            balance_book: book,
        })
    }

    /// Records that `debtor` owes `creditor` an extra `value`, outside of any order.
    pub async fn owe_credit(
        &self,
        debtor: &Identity,
        creditor: &Identity,
        value: Decimal,
    ) -> Result<PairBalance> {
        let mut book = self.store.get_balance_book().await?;

        let pair = match book.add_debt(debtor, creditor, value) {
            Ok(pair) => pair.clone(),
            Err(e) if e.is_bad_request() => {
                get_metrics().record_request_rejected("owe_credit");
                warn!("Rejected owe_credit: {}", e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.store.upsert_balance_book(&book).await?;

        get_metrics().record_debt_posted("owe_credit");
        info!(
            debtor = %masked(debtor),
            creditor = %masked(creditor),
            amount = %mask_amount(&value),
            "Debt recorded"
        );
        Ok(pair)
    }

    /// Forgives everything `debtor` owes `creditor`, leaving the pair settled.
    pub async fn reset_credit(&self, debtor: &Identity, creditor: &Identity) -> Result<PairBalance> {
        if debtor.same_party(creditor) {
            return Err(reject("reset_credit", "You can't do it to yourself."));
        }

        let mut book = self.store.get_balance_book().await?;
        let pair = book.get_or_create_balance(debtor, creditor)?;

        if !pair.has_positive_balance(creditor)? {
            return Err(reject("reset_credit", "Given user doesn't owe you anything."));
        }

        let outstanding = pair.balance.abs();
        pair.add_debt(creditor, outstanding)?;
        let settled = pair.clone();
        book.last_change = settled.last_change;

        self.store.upsert_balance_book(&book).await?;

        get_metrics().record_debt_posted("reset_credit");
        info!(
            debtor = %masked(debtor),
            creditor = %masked(creditor),
            "Debt forgiven"
        );
        Ok(settled)
    }

    pub async fn get_balance_book(&self) -> Result<BalanceBook> {
        self.store.get_balance_book().await
    }

    /// Current balance between two parties; a pair that never interacted reads as settled.
    pub async fn get_pair_balance(&self, a: &Identity, b: &Identity) -> Result<PairBalance> {
        let book = self.store.get_balance_book().await?;
        match book.balance_between(a, b) {
            Some(pair) => Ok(pair.clone()),
            None => PairBalance::new(a.clone(), b.clone()),
        }
    }

    /// The party owing the most across the group, if anyone owes anything.
    pub async fn biggest_debtor(&self) -> Result<Option<BiggestDebtor>> {
        Ok(self.store.get_balance_book().await?.find_biggest_debtor())
    }

    async fn load_open_order(&self, operation: &str) -> Result<Order> {
        match self.store.get_order().await? {
            None => Err(reject(operation, "There is no order open.")),
            Some(order) if !order.is_open() => {
                Err(reject(operation, "Order is closed and cannot be altered."))
            }
            Some(order) => Ok(order),
        }
    }
}

/// Log form of a user id.
fn masked(identity: &Identity) -> String {
    mask_sensitive(&identity.unique_id, 2)
}

fn reject(operation: &str, message: impl Into<String>) -> AppError {
    let message = message.into();
    get_metrics().record_request_rejected(operation);
    warn!(operation = operation, "Rejected request: {}", message);
    AppError::BadRequest(message)
}
