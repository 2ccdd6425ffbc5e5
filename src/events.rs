//! Audit events consumed by external indexers
//!
//! Every state transition appends one event carrying the identifying fields
//! (owner, request id, round id, amounts) needed to rebuild it externally.

use crate::common::types::{amount_str, amounts_str, Address, RequestId};
use crate::games::types::GameKind;
use crate::randomness::Strategy;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WagerEvent {
    EntrySubmitted {
        game: GameKind,
        owner: Address,
        /// Crash round the entry joined, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round_id: Option<u64>,
        sides: Vec<u64>,
        #[serde(with = "amounts_str")]
        amounts: Vec<u128>,
        count: u32,
        #[serde(with = "amount_str")]
        stake: u128,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    RandomnessRequested {
        game: GameKind,
        request_id: RequestId,
        strategy: Strategy,
        block_number: u64,
        /// Hex message the VRF oracle must sign; empty for other strategies
        input: String,
    },
    EntryResolved {
        game: GameKind,
        owner: Address,
        request_id: RequestId,
        outcomes: Vec<u128>,
        played: u32,
        #[serde(with = "amount_str")]
        payout: u128,
        #[serde(with = "amount_str")]
        refund: u128,
        #[serde(with = "amount_str")]
        host_fee: u128,
        #[serde(with = "amount_str")]
        protocol_fee: u128,
    },
    EntryWithdrawn {
        game: GameKind,
        owner: Address,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        #[serde(with = "amount_str")]
        refund: u128,
    },
    RoundPaused {
        round_id: u64,
        request_id: RequestId,
        block_number: u64,
    },
    RoundResolved {
        round_id: u64,
        request_id: RequestId,
        crash_point: u64,
    },
    RoundFailed {
        round_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    RoundClaimed {
        round_id: u64,
        owner: Address,
        #[serde(with = "amount_str")]
        payout: u128,
        #[serde(with = "amount_str")]
        host_fee: u128,
        #[serde(with = "amount_str")]
        protocol_fee: u128,
    },
    RoundWithdrawn {
        round_id: u64,
        owner: Address,
        #[serde(with = "amount_str")]
        refund: u128,
    },
    BatchResolveFailed {
        game: GameKind,
        failed: Vec<RequestId>,
    },
    ConfigUpdated {
        field: String,
        value: String,
    },
    StrategyChanged {
        from: Strategy,
        to: Strategy,
        epoch: u64,
    },
}

/// Append-only buffer of events awaiting collection
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<WagerEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: WagerEvent) {
        tracing::trace!(?event, "Event recorded");
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &WagerEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take every recorded event, leaving the log empty
    pub fn drain(&mut self) -> Vec<WagerEvent> {
        std::mem::take(&mut self.events)
    }
}
