use crate::error::{AppError, Result};
use crate::models::Identity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Separator between the two ids of a pair key. Never appears in platform user ids.
pub const PAIR_KEY_SEPARATOR: &str = "@@@";

/// Net balance between exactly two parties.
/// `party_a` always has the ordinally smaller id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairBalance {
    pub party_a: Identity,
    pub party_b: Identity,
    /// Negative: A owes B. Positive: B owes A.
    pub balance: Decimal,
    pub last_change: DateTime<Utc>,
}

/// Who owes whom, and how much (always non-negative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub debtor: Identity,
    pub creditor: Identity,
    pub amount: Decimal,
}

impl PairBalance {
    /// Creates a settled pair. Argument order does not matter.
    pub fn new(a: Identity, b: Identity) -> Result<Self> {
        let (party_a, party_b) = Self::canonical(&a, &b)?;
        Ok(Self {
            party_a: party_a.clone(),
            party_b: party_b.clone(),
            balance: Decimal::ZERO,
            last_change: Utc::now(),
        })
    }

    fn canonical<'a>(a: &'a Identity, b: &'a Identity) -> Result<(&'a Identity, &'a Identity)> {
        match a.cmp(b) {
            Ordering::Less => Ok((a, b)),
            Ordering::Greater => Ok((b, a)),
            Ordering::Equal => Err(AppError::InvalidArgument(
                "You can't create a pair from the same user.".to_string(),
            )),
        }
    }

    /// Builds the key that identifies the pair in either argument order.
    pub fn key_for(a: &Identity, b: &Identity) -> Result<String> {
        let (first, second) = Self::canonical(a, b)?;
        Ok(format!(
            "{}{}{}",
            first.unique_id, PAIR_KEY_SEPARATOR, second.unique_id
        ))
    }

    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.party_a.unique_id, PAIR_KEY_SEPARATOR, self.party_b.unique_id
        )
    }

    pub fn involves(&self, identity: &Identity) -> bool {
        self.party_a.same_party(identity) || self.party_b.same_party(identity)
    }

    /// Increases `payer`'s debt towards the other party by `amount`.
    pub fn add_debt(&mut self, payer: &Identity, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidArgument(
                "Amount needs to be a positive number.".to_string(),
            ));
        }

        if payer.same_party(&self.party_a) {
            self.balance -= amount;
        } else if payer.same_party(&self.party_b) {
            self.balance += amount;
        } else {
            return Err(AppError::InvalidArgument(format!(
                "User '{}' doesn't belong in this pair.",
                payer.unique_id
            )));
        }

        self.last_change = Utc::now();
        Ok(())
    }

    /// Returns true if `identity` is owed money by the other party.
    pub fn has_positive_balance(&self, identity: &Identity) -> Result<bool> {
        if identity.same_party(&self.party_a) {
            Ok(self.balance > Decimal::ZERO)
        } else if identity.same_party(&self.party_b) {
            Ok(self.balance < Decimal::ZERO)
        } else {
            Err(AppError::InvalidState(format!(
                "User '{}' is not a party of pair '{}'.",
                identity.unique_id,
                self.key()
            )))
        }
    }

    /// Returns the party with negative exposure and the amount it owes.
    /// A settled pair reports `party_a` owing zero.
    pub fn get_debt(&self) -> Debt {
        if self.balance > Decimal::ZERO {
            Debt {
                debtor: self.party_b.clone(),
                creditor: self.party_a.clone(),
                amount: self.balance,
            }
        } else {
            Debt {
                debtor: self.party_a.clone(),
                creditor: self.party_b.clone(),
                amount: -self.balance,
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        self.balance.is_zero()
    }
}
