//! Entry storage
//!
//! Single-slot games keep at most one live entry per owner in
//! [`EntrySlots`]; crash keeps a two-level `(round_id, owner)` table in
//! [`RoundBook`] whose entries outlive the round until claimed or withdrawn.

use crate::common::types::{amount_str, amounts_str, Address, RequestId};
use crate::config::GameConfig;
use crate::errors::{WagerError, WagerResult};
use crate::games::types::Variant;
use crate::math::{checked_add, checked_mul};
use crate::randomness::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    None,
    AwaitingRandomness,
    Resolved,
    WithdrawnOnTimeout,
}

/// Strategy and id of the request an entry waits on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestRef {
    pub strategy: Strategy,
    pub id: RequestId,
}

/// Caller-supplied wager parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryParams {
    pub sides: Vec<u64>,
    pub amounts: Vec<u128>,
    pub stop_loss: u128,
    pub stop_gain: u128,
    pub count: u32,
}

impl EntryParams {
    pub fn new(sides: Vec<u64>, amounts: Vec<u128>, count: u32) -> Self {
        Self {
            sides,
            amounts,
            stop_loss: 0,
            stop_gain: 0,
            count,
        }
    }

    /// One side, one amount
    pub fn single(side: u64, amount: u128, count: u32) -> Self {
        Self::new(vec![side], vec![amount], count)
    }

    pub fn with_stop_loss(mut self, stop_loss: u128) -> Self {
        self.stop_loss = stop_loss;
        self
    }

    pub fn with_stop_gain(mut self, stop_gain: u128) -> Self {
        self.stop_gain = stop_gain;
        self
    }

    /// Check the parameters against a variant and config, returning the full stake
    pub fn validate<V: Variant>(&self, variant: &V, config: &GameConfig) -> WagerResult<u128> {
        if self.count == 0 || self.count > config.max_entry_count {
            return Err(WagerError::InvalidEntryCount {
                count: self.count,
                max: config.max_entry_count,
            });
        }
        if self.sides.is_empty() || self.sides.len() != self.amounts.len() {
            return Err(WagerError::SidesAmountsMismatch);
        }
        if self.amounts.iter().any(|amount| *amount == 0) {
            return Err(WagerError::ZeroAmount);
        }
        variant.validate_sides(&self.sides)?;

        let per_play = self.amounts.iter().try_fold(0u128, |acc, a| checked_add(acc, *a))?;
        let total = checked_mul(per_play, self.count as u128)?;
        let positions = self.count as u128 * self.sides.len() as u128;
        let average = total / positions;
        if average < config.min_entry_amount {
            return Err(WagerError::EntryAmountLowerThanMinEntryAmount {
                average,
                minimum: config.min_entry_amount,
            });
        }
        Ok(total)
    }
}

/// A user's wager
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub owner: Address,
    pub sides: Vec<u64>,
    #[serde(with = "amounts_str")]
    pub amounts: Vec<u128>,
    pub played_count: u32,
    pub total_count: u32,
    #[serde(with = "amount_str")]
    pub stop_loss: u128,
    #[serde(with = "amount_str")]
    pub stop_gain: u128,
    pub block_number: u64,
    /// `None` for crash entries, which share their round's request
    pub request: Option<RequestRef>,
    pub status: EntryStatus,
}

impl Entry {
    pub fn new(owner: Address, params: EntryParams, block_number: u64) -> Self {
        Self {
            owner,
            sides: params.sides,
            amounts: params.amounts,
            played_count: 0,
            total_count: params.count,
            stop_loss: params.stop_loss,
            stop_gain: params.stop_gain,
            block_number,
            request: None,
            status: EntryStatus::AwaitingRandomness,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request.map(|r| r.id)
    }

    /// Stake of one play across all sides
    pub fn stake_per_play(&self) -> WagerResult<u128> {
        self.amounts.iter().try_fold(0u128, |acc, a| checked_add(acc, *a))
    }

    /// Stake debited at submission
    pub fn total_stake(&self) -> WagerResult<u128> {
        checked_mul(self.stake_per_play()?, self.total_count as u128)
    }

    pub fn is_awaiting(&self) -> bool {
        self.status == EntryStatus::AwaitingRandomness
    }
}

/// One live entry per owner
#[derive(Clone, Debug, Default)]
pub struct EntrySlots {
    slots: HashMap<Address, Entry>,
}

impl EntrySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &Address) -> Option<&Entry> {
        self.slots.get(owner)
    }

    pub fn status(&self, owner: &Address) -> EntryStatus {
        self.slots.get(owner).map(|e| e.status).unwrap_or_default()
    }

    pub fn ensure_free(&self, owner: &Address) -> WagerResult<()> {
        match self.status(owner) {
            EntryStatus::None => Ok(()),
            _ => Err(WagerError::EntryInProgress(*owner)),
        }
    }

    pub fn occupy(&mut self, entry: Entry) -> WagerResult<()> {
        self.ensure_free(&entry.owner)?;
        self.slots.insert(entry.owner, entry);
        Ok(())
    }

    /// Entry of `owner` that still waits on `request`
    pub fn awaiting(&self, owner: &Address, request: RequestRef) -> Option<&Entry> {
        self.slots
            .get(owner)
            .filter(|e| e.is_awaiting() && e.request == Some(request))
    }

    /// Clear the slot, handing back the entry
    pub fn release(&mut self, owner: &Address) -> Option<Entry> {
        self.slots.remove(owner)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Crash entries keyed by round, then owner
#[derive(Clone, Debug, Default)]
pub struct RoundBook {
    rounds: BTreeMap<u64, HashMap<Address, Entry>>,
}

impl RoundBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, round_id: u64, owner: &Address) -> Option<&Entry> {
        self.rounds.get(&round_id).and_then(|entries| entries.get(owner))
    }

    pub fn contains(&self, round_id: u64, owner: &Address) -> bool {
        self.get(round_id, owner).is_some()
    }

    pub fn insert(&mut self, round_id: u64, entry: Entry) -> WagerResult<()> {
        let entries = self.rounds.entry(round_id).or_default();
        if entries.contains_key(&entry.owner) {
            return Err(WagerError::EntryInProgress(entry.owner));
        }
        entries.insert(entry.owner, entry);
        Ok(())
    }

    pub fn remove(&mut self, round_id: u64, owner: &Address) -> Option<Entry> {
        let entries = self.rounds.get_mut(&round_id)?;
        let entry = entries.remove(owner);
        if entries.is_empty() {
            self.rounds.remove(&round_id);
        }
        entry
    }

    /// Number of unclaimed entries in a round
    pub fn round_len(&self, round_id: u64) -> usize {
        self.rounds.get(&round_id).map(|e| e.len()).unwrap_or(0)
    }
}
