//! Resolution controller
//!
//! Drives single-slot entries through
//! `None -> AwaitingRandomness -> {Resolved | WithdrawnOnTimeout}` and owns the
//! privileged configuration surface shared with the crash round controller.
//!
//! Every operation follows the same order: validate, compute, hand the
//! ledger one all-or-nothing call, then mutate engine state. A ledger
//! rejection therefore leaves the game exactly as it was.

use crate::common::traits::{Credit, Ledger};
use crate::common::types::{Address, Entropy, RequestId, TxContext};
use crate::config::{EngineConfig, GameConfig};
use crate::entry_store::{Entry, EntryParams, EntrySlots, EntryStatus, RequestRef};
use crate::errors::{WagerError, WagerResult};
use crate::events::{EventLog, WagerEvent};
use crate::games::types::{GameKind, PpvMode, Variant, VariantRules};
use crate::games::{CoinFlip, RollOver, Roulette};
use crate::randomness::{
    Delivery, HashChainProvider, PendingRequest, RandomnessRouter, RequestTarget, Strategy,
};
use crate::settlement::{settle_entry, Settlement};
use crate::stats::GameStats;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Addresses a game acts for or pays out to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    /// Holder of every privileged setter
    pub owner: Address,
    /// Receives the host fee
    pub host: Address,
    /// Receives the protocol fee
    pub protocol: Address,
    /// Identity the game uses towards the ledger (must be whitelisted)
    pub operator: Address,
}

/// State and configuration shared by every game controller
#[derive(Debug)]
pub struct GameCore {
    pub(crate) kind: GameKind,
    pub(crate) config: GameConfig,
    pub(crate) rules: VariantRules,
    pub(crate) router: RandomnessRouter,
    pub(crate) events: EventLog,
    pub(crate) stats: GameStats,
    pub(crate) roles: Roles,
}

impl GameCore {
    pub(crate) fn new<V: Variant>(variant: &V, roles: Roles, config: EngineConfig) -> WagerResult<Self> {
        let rules = VariantRules::of(variant);
        config.game.validate(&rules)?;
        let router = RandomnessRouter::new(&config.randomness)?;

        tracing::info!(
            game = %variant.kind(),
            strategy = %router.active(),
            owner = %roles.owner,
            "Game initialized"
        );

        Ok(Self {
            kind: variant.kind(),
            config: config.game,
            rules,
            router,
            events: EventLog::new(),
            stats: GameStats::default(),
            roles,
        })
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn router(&self) -> &RandomnessRouter {
        &self.router
    }

    pub fn active_strategy(&self) -> Strategy {
        self.router.active()
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand every recorded event to the caller
    pub fn drain_events(&mut self) -> Vec<WagerEvent> {
        self.events.drain()
    }

    pub(crate) fn ensure_owner(&self, ctx: &TxContext) -> WagerResult<()> {
        if ctx.caller != self.roles.owner {
            tracing::warn!(caller = %ctx.caller, game = %self.kind, "Rejected privileged call");
            return Err(WagerError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    fn update_config(
        &mut self,
        ctx: &TxContext,
        field: &str,
        value: String,
        apply: impl FnOnce(&mut GameConfig),
    ) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        let mut next = self.config.clone();
        apply(&mut next);
        next.validate(&self.rules)?;
        self.config = next;
        self.config_updated(field, value);
        Ok(())
    }

    fn config_updated(&mut self, field: &str, value: String) {
        tracing::info!(game = %self.kind, field, value = %value, "Game configuration updated");
        self.events.push(WagerEvent::ConfigUpdated {
            field: field.to_string(),
            value,
        });
    }

    pub fn set_host(&mut self, ctx: &TxContext, host: Address) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        if host.is_zero() {
            return Err(WagerError::invalid_config("host", "cannot be the zero address"));
        }
        self.roles.host = host;
        self.config_updated("host", host.to_string());
        Ok(())
    }

    pub fn set_min_entry_amount(&mut self, ctx: &TxContext, amount: u128) -> WagerResult<()> {
        self.update_config(ctx, "min_entry_amount", amount.to_string(), |c| {
            c.min_entry_amount = amount
        })
    }

    pub fn set_max_entry_count(&mut self, ctx: &TxContext, count: u32) -> WagerResult<()> {
        self.update_config(ctx, "max_entry_count", count.to_string(), |c| {
            c.max_entry_count = count
        })
    }

    pub fn set_batch_resolve_limit(&mut self, ctx: &TxContext, limit: u32) -> WagerResult<()> {
        self.update_config(ctx, "batch_resolve_limit", limit.to_string(), |c| {
            c.batch_resolve_limit = limit
        })
    }

    pub fn set_failure_window(&mut self, ctx: &TxContext, blocks: u64) -> WagerResult<()> {
        self.update_config(ctx, "failure_window_blocks", blocks.to_string(), |c| {
            c.failure_window_blocks = blocks
        })
    }

    pub fn set_fee_shares(&mut self, ctx: &TxContext, host_share: u128, protocol_share: u128) -> WagerResult<()> {
        self.update_config(
            ctx,
            "fee_shares",
            format!("{}/{}", host_share, protocol_share),
            |c| {
                c.host_fee_share = host_share;
                c.protocol_fee_share = protocol_share;
            },
        )
    }

    pub fn set_probability_value(&mut self, ctx: &TxContext, value: u128) -> WagerResult<()> {
        self.update_config(ctx, "probability_value", value.to_string(), |c| {
            c.probability_value = value
        })
    }

    pub fn set_ppv_mode(&mut self, ctx: &TxContext, mode: PpvMode) -> WagerResult<()> {
        self.update_config(ctx, "ppv_mode", format!("{:?}", mode), |c| c.ppv_mode = mode)
    }

    /// Switch the active randomness strategy. Requests outstanding under the
    /// previous one can only be recovered through withdraw / fail_round.
    pub fn set_strategy(&mut self, ctx: &TxContext, strategy: Strategy) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        let previous = self.router.active();
        self.router.set_strategy(strategy)?;
        if previous != strategy {
            self.events.push(WagerEvent::StrategyChanged {
                from: previous,
                to: strategy,
                epoch: self.router.epoch(),
            });
        }
        Ok(())
    }

    pub fn set_vrf_params(&mut self, ctx: &TxContext, coordinator: Address, public_key_hex: &str) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        self.router.configure_vrf(coordinator, public_key_hex)?;
        self.config_updated("vrf_coordinator", coordinator.to_string());
        Ok(())
    }

    pub fn set_entropy_params(&mut self, ctx: &TxContext, provider: Address) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        self.router.configure_entropy_service(provider);
        self.config_updated("entropy_provider", provider.to_string());
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: &TxContext, new_owner: Address) -> WagerResult<()> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(WagerError::invalid_config("owner", "cannot be the zero address"));
        }
        self.roles.owner = new_owner;
        self.config_updated("owner", new_owner.to_string());
        Ok(())
    }

    /// Issue a request under the active strategy and log it
    pub(crate) fn request_randomness(&mut self, ctx: &TxContext, target: RequestTarget) -> WagerResult<PendingRequest> {
        let request = self.router.request(ctx, target)?;
        self.events.push(WagerEvent::RandomnessRequested {
            game: self.kind,
            request_id: request.id,
            strategy: request.strategy,
            block_number: request.block_number,
            input: hex::encode(&request.input),
        });
        Ok(request)
    }

    /// Validate a delivery, logging rejections
    pub(crate) fn check_delivery(
        &self,
        ctx: &TxContext,
        id: RequestId,
        delivery: &Delivery,
    ) -> WagerResult<(PendingRequest, Entropy)> {
        self.router.resolve(ctx, id, delivery).map_err(|e| {
            tracing::warn!(
                game = %self.kind,
                request_id = %id,
                strategy = %delivery.strategy(),
                caller = %ctx.caller,
                error = %e,
                "Rejected randomness delivery"
            );
            e
        })
    }

    pub(crate) fn credits_for(&self, settlement: &Settlement) -> WagerResult<Vec<Credit>> {
        settlement.credits(self.roles.host, self.roles.protocol)
    }
}

/// A resolved entry together with what it paid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub request_id: RequestId,
    pub entry: Entry,
    pub settlement: Settlement,
}

/// Outcome of a batch resolve: settled entries plus ids that could not be resolved
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchResolveReport {
    pub resolved: Vec<Resolution>,
    pub failed: Vec<RequestId>,
}

impl BatchResolveReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Game with one pending entry per owner (coin flip, roulette, roll-over)
#[derive(Debug)]
pub struct SingleEntryGame<V: Variant> {
    variant: V,
    core: GameCore,
    slots: EntrySlots,
}

pub type CoinFlipGame = SingleEntryGame<CoinFlip>;
pub type RouletteGame = SingleEntryGame<Roulette>;
pub type RollOverGame = SingleEntryGame<RollOver>;

impl<V: Variant> SingleEntryGame<V> {
    pub fn new(variant: V, roles: Roles, config: EngineConfig) -> WagerResult<Self> {
        let core = GameCore::new(&variant, roles, config)?;
        Ok(Self {
            variant,
            core,
            slots: EntrySlots::new(),
        })
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn core(&self) -> &GameCore {
        &self.core
    }

    /// Privileged configuration surface
    pub fn core_mut(&mut self) -> &mut GameCore {
        &mut self.core
    }

    /// Debit the stake and request randomness for a new entry
    pub fn submit_entry<L: Ledger>(
        &mut self,
        ctx: &TxContext,
        ledger: &mut L,
        params: EntryParams,
    ) -> WagerResult<RequestId> {
        let stake = params.validate(&self.variant, &self.core.config)?;
        self.slots.ensure_free(&ctx.caller)?;

        let request = self.core.router.request(ctx, RequestTarget::Entry(ctx.caller))?;
        if let Err(e) = ledger.debit(&self.core.roles.operator, &ctx.caller, stake) {
            self.core.router.cancel(request.strategy, request.id);
            tracing::warn!(owner = %ctx.caller, stake, error = %e, "Stake debit rejected");
            return Err(e.into());
        }

        let mut entry = Entry::new(ctx.caller, params, ctx.block_number);
        entry.request = Some(RequestRef {
            strategy: request.strategy,
            id: request.id,
        });

        self.core.events.push(WagerEvent::RandomnessRequested {
            game: self.core.kind,
            request_id: request.id,
            strategy: request.strategy,
            block_number: request.block_number,
            input: hex::encode(&request.input),
        });
        self.core.events.push(WagerEvent::EntrySubmitted {
            game: self.core.kind,
            owner: ctx.caller,
            round_id: None,
            sides: entry.sides.clone(),
            amounts: entry.amounts.clone(),
            count: entry.total_count,
            stake,
            request_id: Some(request.id),
        });
        self.core.stats.record_submission(stake);
        self.slots.occupy(entry)?;

        tracing::debug!(
            game = %self.core.kind,
            owner = %ctx.caller,
            request_id = %request.id,
            strategy = %request.strategy,
            stake,
            "Entry submitted"
        );
        Ok(request.id)
    }

    /// Apply a randomness delivery to the entry waiting on `id`
    pub fn fulfill<L: Ledger>(
        &mut self,
        ctx: &TxContext,
        ledger: &mut L,
        id: RequestId,
        delivery: Delivery,
    ) -> WagerResult<Resolution> {
        let (request, entropy) = self.core.check_delivery(ctx, id, &delivery)?;
        let entry = self.pending_entry(&request)?;
        let settlement = settle_entry(&self.variant, entry, &entropy, &self.core.config)?;

        let credits = self.core.credits_for(&settlement)?;
        ledger.credit_mint_batch(&self.core.roles.operator, &credits)?;

        self.commit(&request, &entropy, settlement)
    }

    /// Resolve `id` with the self-computed hash chain
    pub fn resolve<L: Ledger>(&mut self, ctx: &TxContext, ledger: &mut L, id: RequestId) -> WagerResult<Resolution> {
        self.fulfill(ctx, ledger, id, Delivery::HashChain)
    }

    /// Resolve several hash chain requests in one call.
    ///
    /// Ids that are unknown, duplicated, issued under another strategy or
    /// already resolved land in `failed`; the rest settle normally. A ledger
    /// rejection aborts the whole batch.
    pub fn batch_resolve<L: Ledger>(
        &mut self,
        ctx: &TxContext,
        ledger: &mut L,
        ids: &[RequestId],
    ) -> WagerResult<BatchResolveReport> {
        let limit = self.core.config.batch_resolve_limit;
        if ids.len() > limit as usize {
            return Err(WagerError::ExceedsBatchResolveLimit {
                requested: ids.len(),
                limit,
            });
        }

        let mut seed = self.core.router.hash_chain_seed();
        let mut seen = HashSet::new();
        let mut planned: Vec<(PendingRequest, Entropy, Settlement)> = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();

        for &id in ids {
            if !seen.insert(id) {
                failed.push(id);
                continue;
            }
            let plan = self
                .core
                .router
                .resolvable(Strategy::HashChain, id)
                .and_then(|request| {
                    let entry = self.pending_entry(request)?;
                    let entropy = HashChainProvider::derive(&seed, id, ctx);
                    let settlement = settle_entry(&self.variant, entry, &entropy, &self.core.config)?;
                    Ok((request.clone(), entropy, settlement))
                });
            match plan {
                Ok(plan) => {
                    seed = plan.1 .0;
                    planned.push(plan);
                }
                Err(e) => {
                    tracing::debug!(request_id = %id, error = %e, "Batch resolve skipped request");
                    failed.push(id);
                }
            }
        }

        let mut credits = Vec::new();
        for (_, _, settlement) in &planned {
            credits.extend(self.core.credits_for(settlement)?);
        }
        if !credits.is_empty() {
            ledger.credit_mint_batch(&self.core.roles.operator, &credits)?;
        }

        let mut report = BatchResolveReport {
            resolved: Vec::with_capacity(planned.len()),
            failed,
        };
        for (request, entropy, settlement) in planned {
            report.resolved.push(self.commit(&request, &entropy, settlement)?);
        }

        if report.is_partial() {
            tracing::warn!(
                game = %self.core.kind,
                failed = report.failed.len(),
                resolved = report.resolved.len(),
                "Batch resolve finished with failures"
            );
            self.core.stats.record_batch_failures(report.failed.len());
            self.core.events.push(WagerEvent::BatchResolveFailed {
                game: self.core.kind,
                failed: report.failed.clone(),
            });
        }
        Ok(report)
    }

    /// Refund the caller's entry once the failure window has passed without a delivery
    pub fn withdraw<L: Ledger>(&mut self, ctx: &TxContext, ledger: &mut L) -> WagerResult<Entry> {
        let owner = ctx.caller;
        let entry = self
            .slots
            .get(&owner)
            .filter(|e| e.is_awaiting())
            .ok_or(WagerError::EntryNotInProgress(owner))?;

        let available_at = entry
            .block_number
            .saturating_add(self.core.config.failure_window_blocks);
        if ctx.block_number < available_at {
            return Err(WagerError::TooEarlyToWithdraw {
                current: ctx.block_number,
                available_at,
            });
        }

        let refund = entry.total_stake()?;
        ledger.credit_mint(&self.core.roles.operator, &owner, refund)?;

        let mut entry = self
            .slots
            .release(&owner)
            .ok_or(WagerError::EntryNotInProgress(owner))?;
        if let Some(request) = entry.request {
            self.core.router.cancel(request.strategy, request.id);
        }
        entry.status = EntryStatus::WithdrawnOnTimeout;

        self.core.stats.record_withdrawal(refund);
        self.core.events.push(WagerEvent::EntryWithdrawn {
            game: self.core.kind,
            owner,
            request_id: entry.request_id(),
            refund,
        });
        tracing::info!(game = %self.core.kind, owner = %owner, refund, "Entry withdrawn after timeout");
        Ok(entry)
    }

    pub fn entry_of(&self, owner: &Address) -> Option<&Entry> {
        self.slots.get(owner)
    }

    pub fn entry_status(&self, owner: &Address) -> EntryStatus {
        self.slots.status(owner)
    }

    /// Owner of an outstanding request
    pub fn owner_of_request(&self, strategy: Strategy, id: RequestId) -> Option<Address> {
        match self.core.router.target_of(strategy, id)? {
            RequestTarget::Entry(owner) => Some(owner),
            RequestTarget::Round(_) => None,
        }
    }

    pub fn drain_events(&mut self) -> Vec<WagerEvent> {
        self.core.drain_events()
    }

    fn pending_entry(&self, request: &PendingRequest) -> WagerResult<&Entry> {
        let owner = match request.target {
            RequestTarget::Entry(owner) => owner,
            RequestTarget::Round(_) => return Err(WagerError::RequestNotInProgress(request.id)),
        };
        let reference = RequestRef {
            strategy: request.strategy,
            id: request.id,
        };
        self.slots
            .awaiting(&owner, reference)
            .ok_or(WagerError::RequestNotInProgress(request.id))
    }

    fn commit(&mut self, request: &PendingRequest, entropy: &Entropy, settlement: Settlement) -> WagerResult<Resolution> {
        self.core.router.complete(request.strategy, request.id, entropy);
        let mut entry = self
            .slots
            .release(&settlement.owner)
            .ok_or(WagerError::EntryNotInProgress(settlement.owner))?;
        entry.played_count = settlement.played;
        entry.status = EntryStatus::Resolved;

        self.core.stats.record_settlement(&settlement);
        self.core.events.push(WagerEvent::EntryResolved {
            game: self.core.kind,
            owner: settlement.owner,
            request_id: request.id,
            outcomes: settlement.outcomes.clone(),
            played: settlement.played,
            payout: settlement.payout,
            refund: settlement.refund,
            host_fee: settlement.host_fee,
            protocol_fee: settlement.protocol_fee,
        });
        tracing::info!(
            game = %self.core.kind,
            owner = %settlement.owner,
            request_id = %request.id,
            played = settlement.played,
            payout = settlement.payout,
            refund = settlement.refund,
            "Entry resolved"
        );

        Ok(Resolution {
            request_id: request.id,
            entry,
            settlement,
        })
    }
}
