use crate::error::{AppError, Result};
use crate::models::{Debt, Identity, PairBalance};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// All pairwise balances of one group.
/// Keyed by `PairBalance::key_for`, so each unordered pair has at most one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceBook {
    pub balances: BTreeMap<String, PairBalance>,
    pub last_change: DateTime<Utc>,
}

/// The party owing the most to everyone else combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiggestDebtor {
    pub debtor: Identity,
    pub total_debt: Decimal,
}

impl Default for BalanceBook {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceBook {
    pub fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
            last_change: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Returns the pair entry for `a` and `b`, inserting a settled one if missing.
    pub fn get_or_create_balance(&mut self, a: &Identity, b: &Identity) -> Result<&mut PairBalance> {
        let key = PairBalance::key_for(a, b)?;
        let pair = match self.balances.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(PairBalance::new(a.clone(), b.clone())?),
        };
        Ok(pair)
    }

    /// Read-only lookup; `None` if the pair never interacted.
    pub fn balance_between(&self, a: &Identity, b: &Identity) -> Option<&PairBalance> {
        PairBalance::key_for(a, b)
            .ok()
            .and_then(|key| self.balances.get(&key))
    }

    /// Increases `debtor`'s debt to `creditor` by `amount` and returns the updated pair.
    pub fn add_debt(
        &mut self,
        debtor: &Identity,
        creditor: &Identity,
        amount: Decimal,
    ) -> Result<&PairBalance> {
        if debtor.same_party(creditor) {
            return Err(AppError::bad_request("You can't add debt to yourself."));
        }

        let key = PairBalance::key_for(debtor, creditor)?;
        self.get_or_create_balance(debtor, creditor)?
            .add_debt(debtor, amount)?;
        self.last_change = Utc::now();

        self.balances
            .get(&key)
            .ok_or_else(|| AppError::InvalidState(format!("Pair '{}' missing after update", key)))
    }

    /// Finds the party owing the most in total across all pairs.
    ///
    /// Returns `None` when the book is empty or everyone is even. On an exact tie the
    /// debtor seen first while walking pairs in key order wins.
    pub fn find_biggest_debtor(&self) -> Option<BiggestDebtor> {
        let mut totals: Vec<(Identity, Decimal)> = Vec::new();

        for pair in self.balances.values() {
            let debt = pair.get_debt();
            match totals.iter_mut().find(|(who, _)| who.same_party(&debt.debtor)) {
                Some((_, total)) => *total += debt.amount,
                None => totals.push((debt.debtor, debt.amount)),
            }
        }

        let mut biggest: Option<(Identity, Decimal)> = None;
        for (debtor, total) in totals {
            let is_bigger = match &biggest {
                Some((_, current)) => total > *current,
                None => true,
            };
            if is_bigger {
                biggest = Some((debtor, total));
            }
        }

        match biggest {
            Some((debtor, total_debt)) if !total_debt.is_zero() => {
                Some(BiggestDebtor { debtor, total_debt })
            }
            _ => None,
        }
    }

    /// Every unsettled pair as a debt record, in pair-key order.
    pub fn outstanding_debts(&self) -> Vec<Debt> {
        self.balances
            .values()
            .filter(|pair| !pair.is_settled())
            .map(PairBalance::get_debt)
            .collect()
    }

    /// Total amount `identity` owes to everyone else.
    pub fn total_owed_by(&self, identity: &Identity) -> Decimal {
        self.balances
            .values()
            .map(PairBalance::get_debt)
            .filter(|debt| debt.debtor.same_party(identity))
            .map(|debt| debt.amount)
            .sum()
    }
}
