//! Error types for the wagering engine
//!
//! Validation and state-conflict failures are synchronous rejections with no
//! state change. Ledger failures abort the whole triggering operation.

use crate::common::types::{Address, RequestId};
use crate::randomness::Strategy;

/// Failures reported by the balance ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Operator {0} is not whitelisted to mint or burn")]
    NotWhitelisted(Address),

    #[error("Insufficient balance for {owner}: has {balance}, needs {required}")]
    InsufficientBalance {
        owner: Address,
        balance: u128,
        required: u128,
    },

    #[error("Ledger balance overflow")]
    Overflow,
}

/// Root error type for every engine operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WagerError {
    // Validation
    #[error("Entry count {count} outside [1, {max}]")]
    InvalidEntryCount { count: u32, max: u32 },

    #[error("Entry must carry one amount per side and at least one side")]
    SidesAmountsMismatch,

    #[error("Entry amounts must be greater than zero")]
    ZeroAmount,

    #[error("Side {0} is not legal for this game")]
    InvalidSide(u64),

    #[error("Entry carries {given} sides, this game accepts at most {max}")]
    TooManySides { given: usize, max: usize },

    #[error("Crash sides must be strictly ascending")]
    SidesNotAscending,

    #[error("Average entry amount {average} is lower than the minimum {minimum}")]
    EntryAmountLowerThanMinEntryAmount { average: u128, minimum: u128 },

    #[error("Batch of {requested} exceeds the limit of {limit}")]
    ExceedsBatchResolveLimit { requested: usize, limit: u32 },

    // State conflicts
    #[error("Entry already in progress for {0}")]
    EntryInProgress(Address),

    #[error("No entry in progress for {0}")]
    EntryNotInProgress(Address),

    #[error("Request {0} is not in progress")]
    RequestNotInProgress(RequestId),

    #[error("Too early to withdraw: current block {current}, available at {available_at}")]
    TooEarlyToWithdraw { current: u64, available_at: u64 },

    #[error("Round {0} is paused")]
    RoundPaused(u64),

    #[error("Round {0} is not paused")]
    RoundNotPaused(u64),

    #[error("Round {0} is not resolved yet")]
    RoundNotResolvedYet(u64),

    #[error("Round {0} failed; withdraw instead")]
    RoundFailed(u64),

    #[error("Round {0} did not fail")]
    RoundNotFailed(u64),

    #[error("No entry for {user} in round {round_id}")]
    RoundEntryNotFound { round_id: u64, user: Address },

    #[error("Too early to fail round {round_id}: current block {current}, available at {available_at}")]
    TooEarlyToFailRound {
        round_id: u64,
        current: u64,
        available_at: u64,
    },

    // Authorization and randomness
    #[error("Caller {0} is not authorized")]
    Unauthorized(Address),

    #[error("Randomness strategy {0} is not configured")]
    RandomnessNotConfigured(Strategy),

    #[error("Invalid randomness proof: {0}")]
    InvalidRandomnessProof(String),

    // Configuration and math
    #[error("Invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    // External dependency
    #[error("Ledger rejected operation: {0}")]
    Ledger(#[from] LedgerError),
}

impl WagerError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        WagerError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results
pub type WagerResult<T> = Result<T, WagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WagerError::TooEarlyToWithdraw {
            current: 10,
            available_at: 20,
        };
        assert!(err.to_string().contains("current block 10"));
        assert!(err.to_string().contains("available at 20"));
    }

    #[test]
    fn test_ledger_error_conversion() {
        let owner = Address::from_byte(7);
        let err: WagerError = LedgerError::NotWhitelisted(owner).into();

        match err {
            WagerError::Ledger(LedgerError::NotWhitelisted(addr)) => assert_eq!(addr, owner),
            other => panic!("Expected ledger error, got {:?}", other),
        }
    }
}
