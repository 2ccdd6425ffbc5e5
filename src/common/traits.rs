//! Collaborator interfaces
//!
//! The balance ledger lives outside the engine. Games only see it through
//! this trait so hosts can plug in their own token contract.

use crate::common::types::Address;
use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};

/// One mint instruction produced by a settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub recipient: Address,
    #[serde(with = "crate::common::types::amount_str")]
    pub amount: u128,
}

impl Credit {
    pub fn new(recipient: Address, amount: u128) -> Self {
        Self { recipient, amount }
    }
}

/// Fungible balance ledger with a mint/burn whitelist
pub trait Ledger {
    /// Whether `operator` is allowed to mint and burn
    fn is_whitelisted(&self, operator: &Address) -> bool;

    /// Current balance of `owner`
    fn balance_of(&self, owner: &Address) -> u128;

    /// Burn `amount` from `owner` on behalf of `operator`
    fn debit(&mut self, operator: &Address, owner: &Address, amount: u128) -> Result<(), LedgerError>;

    /// Mint every credit or none of them
    fn credit_mint_batch(&mut self, operator: &Address, credits: &[Credit]) -> Result<(), LedgerError>;

    /// Mint a single credit
    fn credit_mint(&mut self, operator: &Address, recipient: &Address, amount: u128) -> Result<(), LedgerError> {
        self.credit_mint_batch(operator, &[Credit::new(*recipient, amount)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Ledger that accepts everything and records mints
    #[derive(Default)]
    struct RecordingLedger {
        minted: HashMap<Address, u128>,
    }

    impl Ledger for RecordingLedger {
        fn is_whitelisted(&self, _operator: &Address) -> bool {
            true
        }

        fn balance_of(&self, owner: &Address) -> u128 {
            self.minted.get(owner).copied().unwrap_or(0)
        }

        fn debit(&mut self, _operator: &Address, _owner: &Address, _amount: u128) -> Result<(), LedgerError> {
            Ok(())
        }

        fn credit_mint_batch(&mut self, _operator: &Address, credits: &[Credit]) -> Result<(), LedgerError> {
            for credit in credits {
                *self.minted.entry(credit.recipient).or_default() += credit.amount;
            }
            Ok(())
        }
    }

    #[test]
    fn test_single_credit_goes_through_batch() {
        let mut ledger = RecordingLedger::default();
        let user = Address::from_byte(1);
        ledger.credit_mint(&Address::ZERO, &user, 25).unwrap();
        ledger.credit_mint(&Address::ZERO, &user, 5).unwrap();
        assert_eq!(ledger.balance_of(&user), 30);
    }
}
