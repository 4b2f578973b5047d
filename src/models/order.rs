use crate::models::Identity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One participant's cost line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub debtor_id: String,
    pub debtor_name: Option<String>,
    pub value: Decimal,
    pub item: Option<String>,
}

impl Cost {
    pub fn new(eater: &Identity, value: Decimal, item: Option<String>) -> Self {
        Self {
            debtor_id: eater.unique_id.clone(),
            debtor_name: eater.display_name.clone(),
            value,
            item,
        }
    }

    /// The identity this cost line is attributed to.
    pub fn debtor(&self) -> Identity {
        Identity {
            unique_id: self.debtor_id.clone(),
            display_name: self.debtor_name.clone(),
        }
    }
}

/// An expense-collection session, open or recently closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub owner: Identity,
    pub date_created: DateTime<Utc>,
    pub date_closed: Option<DateTime<Utc>>,
    /// Split evenly across all cost lines on completion.
    pub shared_cost: Decimal,
    /// Cost lines keyed by debtor id.
    pub costs: BTreeMap<String, Cost>,
}

impl Order {
    /// Creates an empty open order hosted by `owner`.
    pub fn new(owner: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            date_created: Utc::now(),
            date_closed: None,
            shared_cost: Decimal::ZERO,
            costs: BTreeMap::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.date_closed.is_none()
    }

    pub fn is_ready_for_completion(&self) -> bool {
        self.is_open() && self.costs.len() >= 2
    }

    pub fn participant_count(&self) -> usize {
        self.costs.len()
    }

    pub fn total_cost(&self) -> Decimal {
        self.costs.values().map(|cost| cost.value).sum::<Decimal>() + self.shared_cost
    }

    /// Share of `shared_cost` attributed to every cost line. Zero when there are no lines.
    pub fn shared_part(&self) -> Decimal {
        if self.costs.is_empty() {
            return Decimal::ZERO;
        }
        self.shared_cost / Decimal::from(self.costs.len())
    }

    /// Sets or replaces the cost line of `eater`. A zero value removes the line.
    pub fn set_cost(&mut self, eater: &Identity, value: Decimal, item: Option<String>) {
        if value.is_zero() {
            self.costs.remove(&eater.unique_id);
        } else {
            self.costs
                .insert(eater.unique_id.clone(), Cost::new(eater, value, item));
        }
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        self.owner.same_party(identity)
    }

    /// Debts the order produces on completion: every non-owner line owes its value
    /// plus the shared part to the owner.
    pub fn owner_claims(&self) -> Vec<(Identity, Decimal)> {
        let shared_part = self.shared_part();
        self.costs
            .values()
            .filter(|cost| cost.debtor_id != self.owner.unique_id)
            .map(|cost| (cost.debtor(), cost.value + shared_part))
            .collect()
    }

    pub fn close(&mut self) {
        self.date_closed = Some(Utc::now());
    }

    pub fn reopen(&mut self) {
        self.date_closed = None;
    }
}
