//! Crash round controller
//!
//! Rounds cycle `Open -> Paused -> {Resolved | Failed}`. Entries join the open
//! round, the manager pauses it and requests one value for every participant,
//! and each participant claims (resolved) or withdraws (failed) later, one
//! round at a time or in a batch.

use crate::common::traits::{Credit, Ledger};
use crate::common::types::{Address, RequestId, TxContext};
use crate::config::EngineConfig;
use crate::controller::{GameCore, Roles};
use crate::entry_store::{Entry, EntryParams, RoundBook};
use crate::errors::{WagerError, WagerResult};
use crate::events::WagerEvent;
use crate::games::Crash;
use crate::math::checked_add;
use crate::randomness::{Delivery, RequestTarget, Strategy};
use crate::settlement::{settle_round_entry, Edge, Settlement};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The round currently accepting (or locking) entries
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: u64,
    pub paused: bool,
    pub request_id: Option<RequestId>,
    pub strategy: Option<Strategy>,
    pub block_number_of_pause: u64,
}

impl Round {
    fn open(round_id: u64) -> Self {
        Self {
            round_id,
            paused: false,
            request_id: None,
            strategy: None,
            block_number_of_pause: 0,
        }
    }
}

/// How a finished round ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Crash point in hundredths, with the edge it was drawn under. Claims
    /// settle against that edge even if the configuration changed since.
    Resolved { crash_point: u64, edge: Edge },
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Paused,
    Resolved { crash_point: u64 },
    Failed,
    /// Round id not reached yet
    Unknown,
}

/// A caller's entry in one round, with that round's status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimableEntry {
    pub round_id: u64,
    pub status: RoundStatus,
    pub entry: Entry,
}

/// Result of a batch claim
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimReport {
    pub claimed: Vec<(u64, Settlement)>,
    /// Rounds with nothing left to claim for the caller
    pub skipped: Vec<u64>,
}

impl ClaimReport {
    pub fn total_payout(&self) -> WagerResult<u128> {
        self.claimed
            .iter()
            .try_fold(0u128, |acc, (_, s)| checked_add(acc, s.payout))
    }
}

#[derive(Debug)]
pub struct CrashGame {
    core: GameCore,
    manager: Address,
    round: Round,
    outcomes: HashMap<u64, RoundOutcome>,
    book: RoundBook,
}

impl CrashGame {
    pub fn new(roles: Roles, manager: Address, config: EngineConfig) -> WagerResult<Self> {
        let core = GameCore::new(&Crash, roles, config)?;
        Ok(Self {
            core,
            manager,
            round: Round::open(1),
            outcomes: HashMap::new(),
            book: RoundBook::new(),
        })
    }

    pub fn core(&self) -> &GameCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut GameCore {
        &mut self.core
    }

    pub fn manager(&self) -> Address {
        self.manager
    }

    pub fn set_manager(&mut self, ctx: &TxContext, manager: Address) -> WagerResult<()> {
        self.core.ensure_owner(ctx)?;
        self.manager = manager;
        tracing::info!(manager = %manager, "Crash manager updated");
        self.core.events.push(WagerEvent::ConfigUpdated {
            field: "manager".to_string(),
            value: manager.to_string(),
        });
        Ok(())
    }

    /// Join the open round
    pub fn submit_entry<L: Ledger>(&mut self, ctx: &TxContext, ledger: &mut L, params: EntryParams) -> WagerResult<u64> {
        let round_id = self.round.round_id;
        if self.round.paused {
            return Err(WagerError::RoundPaused(round_id));
        }
        let stake = params.validate(&Crash, &self.core.config)?;
        if self.book.contains(round_id, &ctx.caller) {
            return Err(WagerError::EntryInProgress(ctx.caller));
        }

        ledger.debit(&self.core.roles.operator, &ctx.caller, stake)?;

        let entry = Entry::new(ctx.caller, params, ctx.block_number);
        self.core.events.push(WagerEvent::EntrySubmitted {
            game: self.core.kind,
            owner: ctx.caller,
            round_id: Some(round_id),
            sides: entry.sides.clone(),
            amounts: entry.amounts.clone(),
            count: entry.total_count,
            stake,
            request_id: None,
        });
        self.book.insert(round_id, entry)?;
        self.core.stats.record_submission(stake);

        tracing::debug!(round_id, owner = %ctx.caller, stake, "Crash entry submitted");
        Ok(round_id)
    }

    /// Lock the open round and request its randomness (manager only)
    pub fn pause_and_request(&mut self, ctx: &TxContext) -> WagerResult<RequestId> {
        if ctx.caller != self.manager {
            return Err(WagerError::Unauthorized(ctx.caller));
        }
        let round_id = self.round.round_id;
        if self.round.paused {
            return Err(WagerError::RoundPaused(round_id));
        }

        let request = self.core.request_randomness(ctx, RequestTarget::Round(round_id))?;
        self.round.paused = true;
        self.round.request_id = Some(request.id);
        self.round.strategy = Some(request.strategy);
        self.round.block_number_of_pause = ctx.block_number;

        self.core.events.push(WagerEvent::RoundPaused {
            round_id,
            request_id: request.id,
            block_number: ctx.block_number,
        });
        tracing::info!(
            round_id,
            request_id = %request.id,
            strategy = %request.strategy,
            entries = self.book.round_len(round_id),
            "Round paused"
        );
        Ok(request.id)
    }

    /// Record the round's crash point and open the next round
    pub fn fulfill(&mut self, ctx: &TxContext, id: RequestId, delivery: Delivery) -> WagerResult<u64> {
        let (request, entropy) = self.core.check_delivery(ctx, id, &delivery)?;
        let round_id = match request.target {
            RequestTarget::Round(round_id) if self.round.paused && round_id == self.round.round_id => round_id,
            _ => return Err(WagerError::RequestNotInProgress(id)),
        };

        let edge = Edge::from_config(&self.core.config)?;
        let crash_point = Crash::crash_point(&entropy, edge.outcome_skew)?;

        self.core.router.complete(request.strategy, request.id, &entropy);
        self.outcomes.insert(round_id, RoundOutcome::Resolved { crash_point, edge });
        self.round = Round::open(round_id + 1);

        self.core.events.push(WagerEvent::RoundResolved {
            round_id,
            request_id: id,
            crash_point,
        });
        tracing::info!(round_id, crash_point, "Round resolved");
        Ok(crash_point)
    }

    /// Resolve the paused round with the self-computed hash chain
    pub fn resolve(&mut self, ctx: &TxContext, id: RequestId) -> WagerResult<u64> {
        self.fulfill(ctx, id, Delivery::HashChain)
    }

    /// Abandon a paused round whose randomness never arrived
    pub fn fail_round(&mut self, ctx: &TxContext) -> WagerResult<u64> {
        let round_id = self.round.round_id;
        if !self.round.paused {
            return Err(WagerError::RoundNotPaused(round_id));
        }
        let available_at = self
            .round
            .block_number_of_pause
            .saturating_add(self.core.config.failure_window_blocks);
        if ctx.block_number < available_at {
            return Err(WagerError::TooEarlyToFailRound {
                round_id,
                current: ctx.block_number,
                available_at,
            });
        }

        let request_id = self.round.request_id;
        if let (Some(strategy), Some(id)) = (self.round.strategy, request_id) {
            self.core.router.cancel(strategy, id);
        }
        self.outcomes.insert(round_id, RoundOutcome::Failed);
        self.round = Round::open(round_id + 1);

        self.core.events.push(WagerEvent::RoundFailed { round_id, request_id });
        tracing::warn!(round_id, request_id = ?request_id, "Round failed");
        Ok(round_id)
    }

    /// Collect the caller's payout for a resolved round
    pub fn claim<L: Ledger>(&mut self, ctx: &TxContext, ledger: &mut L, round_id: u64) -> WagerResult<Settlement> {
        let (crash_point, edge) = self.resolved_round(round_id)?;
        let entry = self
            .book
            .get(round_id, &ctx.caller)
            .ok_or(WagerError::RoundEntryNotFound {
                round_id,
                user: ctx.caller,
            })?;
        let settlement = settle_round_entry(&Crash, entry, crash_point as u128, &edge, &self.core.config)?;

        let credits = self.core.credits_for(&settlement)?;
        ledger.credit_mint_batch(&self.core.roles.operator, &credits)?;

        self.commit_claim(round_id, &settlement);
        Ok(settlement)
    }

    /// Claim several rounds at once.
    ///
    /// Rounds the caller has no entry in (never joined, already claimed, or
    /// listed twice) are reported in `skipped`. Any unresolved or failed round
    /// aborts the call.
    pub fn batch_claim<L: Ledger>(
        &mut self,
        ctx: &TxContext,
        ledger: &mut L,
        round_ids: &[u64],
    ) -> WagerResult<ClaimReport> {
        let limit = self.core.config.batch_resolve_limit;
        if round_ids.len() > limit as usize {
            return Err(WagerError::ExceedsBatchResolveLimit {
                requested: round_ids.len(),
                limit,
            });
        }

        let mut report = ClaimReport::default();
        let mut seen = HashSet::new();
        let mut credits: Vec<Credit> = Vec::new();

        for &round_id in round_ids {
            let (crash_point, edge) = self.resolved_round(round_id)?;
            let entry = match self.book.get(round_id, &ctx.caller) {
                Some(entry) if seen.insert(round_id) => entry,
                _ => {
                    report.skipped.push(round_id);
                    continue;
                }
            };
            let settlement = settle_round_entry(&Crash, entry, crash_point as u128, &edge, &self.core.config)?;
            credits.extend(self.core.credits_for(&settlement)?);
            report.claimed.push((round_id, settlement));
        }

        if !credits.is_empty() {
            ledger.credit_mint_batch(&self.core.roles.operator, &credits)?;
        }
        for (round_id, settlement) in &report.claimed {
            self.commit_claim(*round_id, settlement);
        }

        if !report.skipped.is_empty() {
            tracing::debug!(owner = %ctx.caller, skipped = ?report.skipped, "Batch claim skipped rounds");
        }
        Ok(report)
    }

    /// Refund the caller's stake in a failed round
    pub fn withdraw<L: Ledger>(&mut self, ctx: &TxContext, ledger: &mut L, round_id: u64) -> WagerResult<u128> {
        if self.outcomes.get(&round_id) != Some(&RoundOutcome::Failed) {
            return Err(WagerError::RoundNotFailed(round_id));
        }
        let entry = self
            .book
            .get(round_id, &ctx.caller)
            .ok_or(WagerError::RoundEntryNotFound {
                round_id,
                user: ctx.caller,
            })?;
        let refund = entry.total_stake()?;

        ledger.credit_mint(&self.core.roles.operator, &ctx.caller, refund)?;

        self.book.remove(round_id, &ctx.caller);
        self.core.stats.record_withdrawal(refund);
        self.core.events.push(WagerEvent::RoundWithdrawn {
            round_id,
            owner: ctx.caller,
            refund,
        });
        tracing::info!(round_id, owner = %ctx.caller, refund, "Crash entry withdrawn");
        Ok(refund)
    }

    pub fn current_round(&self) -> &Round {
        &self.round
    }

    pub fn round_result(&self, round_id: u64) -> Option<RoundOutcome> {
        self.outcomes.get(&round_id).copied()
    }

    pub fn round_status(&self, round_id: u64) -> RoundStatus {
        if let Some(outcome) = self.outcomes.get(&round_id) {
            return match outcome {
                RoundOutcome::Resolved { crash_point, .. } => RoundStatus::Resolved {
                    crash_point: *crash_point,
                },
                RoundOutcome::Failed => RoundStatus::Failed,
            };
        }
        match round_id {
            id if id == self.round.round_id && self.round.paused => RoundStatus::Paused,
            id if id == self.round.round_id => RoundStatus::Open,
            _ => RoundStatus::Unknown,
        }
    }

    pub fn entry_of(&self, round_id: u64, owner: &Address) -> Option<&Entry> {
        self.book.get(round_id, owner)
    }

    /// The caller's unclaimed entries among `round_ids`, with each round's status
    pub fn claimable_entries(&self, owner: &Address, round_ids: &[u64]) -> Vec<ClaimableEntry> {
        round_ids
            .iter()
            .filter_map(|&round_id| {
                self.book.get(round_id, owner).map(|entry| ClaimableEntry {
                    round_id,
                    status: self.round_status(round_id),
                    entry: entry.clone(),
                })
            })
            .collect()
    }

    /// Round waiting on an outstanding request
    pub fn round_of_request(&self, strategy: Strategy, id: RequestId) -> Option<u64> {
        match self.core.router.target_of(strategy, id)? {
            RequestTarget::Round(round_id) => Some(round_id),
            RequestTarget::Entry(_) => None,
        }
    }

    pub fn drain_events(&mut self) -> Vec<WagerEvent> {
        self.core.drain_events()
    }

    fn resolved_round(&self, round_id: u64) -> WagerResult<(u64, Edge)> {
        match self.outcomes.get(&round_id) {
            Some(RoundOutcome::Resolved { crash_point, edge }) => Ok((*crash_point, *edge)),
            Some(RoundOutcome::Failed) => Err(WagerError::RoundFailed(round_id)),
            None => Err(WagerError::RoundNotResolvedYet(round_id)),
        }
    }

    fn commit_claim(&mut self, round_id: u64, settlement: &Settlement) {
        self.book.remove(round_id, &settlement.owner);
        self.core.stats.record_settlement(settlement);
        self.core.events.push(WagerEvent::RoundClaimed {
            round_id,
            owner: settlement.owner,
            payout: settlement.payout,
            host_fee: settlement.host_fee,
            protocol_fee: settlement.protocol_fee,
        });
        tracing::debug!(round_id, owner = %settlement.owner, payout = settlement.payout, "Crash entry claimed");
    }
}
