//! In-memory balance ledger
//!
//! Reference implementation of the [`Ledger`] collaborator: balances, total
//! supply and a mint/burn whitelist. Credits are staged and validated before
//! any balance changes, so a rejected batch leaves no trace.

use crate::common::traits::{Credit, Ledger};
use crate::common::types::Address;
use crate::errors::LedgerError;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, u128>,
    whitelist: HashSet<Address>,
    total_supply: u128,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `operator` to mint and burn
    pub fn whitelist(&mut self, operator: Address) {
        self.whitelist.insert(operator);
    }

    pub fn remove_from_whitelist(&mut self, operator: &Address) {
        self.whitelist.remove(operator);
    }

    /// Seed a balance outside the whitelist rules (genesis allocation)
    pub fn fund(&mut self, owner: Address, amount: u128) {
        let balance = self.balances.entry(owner).or_default();
        *balance = balance.saturating_add(amount);
        self.total_supply = self.total_supply.saturating_add(amount);
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn ensure_whitelisted(&self, operator: &Address) -> Result<(), LedgerError> {
        if self.whitelist.contains(operator) {
            Ok(())
        } else {
            Err(LedgerError::NotWhitelisted(*operator))
        }
    }
}

impl Ledger for InMemoryLedger {
    fn is_whitelisted(&self, operator: &Address) -> bool {
        self.whitelist.contains(operator)
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn debit(&mut self, operator: &Address, owner: &Address, amount: u128) -> Result<(), LedgerError> {
        self.ensure_whitelisted(operator)?;

        let balance = self.balance_of(owner);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                owner: *owner,
                balance,
                required: amount,
            });
        }

        self.balances.insert(*owner, balance - amount);
        self.total_supply -= amount;
        tracing::trace!(owner = %owner, amount, "Burned stake");
        Ok(())
    }

    fn credit_mint_batch(&mut self, operator: &Address, credits: &[Credit]) -> Result<(), LedgerError> {
        self.ensure_whitelisted(operator)?;

        // Stage every new balance first
        let mut staged: HashMap<Address, u128> = HashMap::new();
        let mut minted: u128 = 0;
        for credit in credits {
            let current = match staged.get(&credit.recipient) {
                Some(value) => *value,
                None => self.balance_of(&credit.recipient),
            };
            let next = current.checked_add(credit.amount).ok_or(LedgerError::Overflow)?;
            staged.insert(credit.recipient, next);
            minted = minted.checked_add(credit.amount).ok_or(LedgerError::Overflow)?;
        }
        let supply = self.total_supply.checked_add(minted).ok_or(LedgerError::Overflow)?;

        self.balances.extend(staged);
        self.total_supply = supply;
        tracing::trace!(credits = credits.len(), minted, "Minted settlement credits");
        Ok(())
    }
}
