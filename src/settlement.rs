//! Settlement engine
//!
//! Turns an entry plus delivered entropy into user winnings, host and
//! protocol fees and an unplayed-stake refund. Nothing here touches the
//! ledger: callers mint [`Settlement::credits`] in one all-or-nothing batch
//! and only then clear engine state.

use crate::common::traits::Credit;
use crate::common::types::{amount_str, Address, Entropy};
use crate::config::GameConfig;
use crate::entry_store::Entry;
use crate::errors::WagerResult;
use crate::games::types::{PpvMode, Variant};
use crate::math::{checked_add, checked_mul, complement, mul_wad, mul_wad2};
use serde::{Deserialize, Serialize};

/// Computed result of one entry
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub owner: Address,
    /// Outcome of each processed play, in play order
    pub outcomes: Vec<u128>,
    pub played: u32,
    #[serde(with = "amount_str")]
    pub played_stake: u128,
    /// Winnings credited to the owner
    #[serde(with = "amount_str")]
    pub payout: u128,
    /// Stake of plays skipped by a stop rule
    #[serde(with = "amount_str")]
    pub refund: u128,
    #[serde(with = "amount_str")]
    pub host_fee: u128,
    #[serde(with = "amount_str")]
    pub protocol_fee: u128,
}

impl Settlement {
    /// Everything the owner receives
    pub fn user_credit(&self) -> WagerResult<u128> {
        checked_add(self.payout, self.refund)
    }

    /// Total newly minted units
    pub fn total_minted(&self) -> WagerResult<u128> {
        checked_add(checked_add(self.user_credit()?, self.host_fee)?, self.protocol_fee)
    }

    /// Mint instructions, zero amounts omitted
    pub fn credits(&self, host: Address, protocol: Address) -> WagerResult<Vec<Credit>> {
        let credits = [
            Credit::new(self.owner, self.user_credit()?),
            Credit::new(host, self.host_fee),
            Credit::new(protocol, self.protocol_fee),
        ];
        Ok(credits.into_iter().filter(|c| c.amount > 0).collect())
    }
}

/// House edge as applied to outcome derivation and to payouts.
///
/// Exactly one side carries the probability value: either `outcome_skew` is
/// non-zero, or winnings are scaled by `reward_factor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub outcome_skew: u128,
    pub reward_factor: Option<u128>,
}

impl Edge {
    pub fn from_config(config: &GameConfig) -> WagerResult<Self> {
        Ok(match config.ppv_mode {
            PpvMode::Reward => Self {
                outcome_skew: 0,
                reward_factor: Some(complement(config.probability_value)?),
            },
            PpvMode::Outcome => Self {
                outcome_skew: config.probability_value,
                reward_factor: None,
            },
        })
    }

    fn payout(&self, stake: u128, multiplier: u128) -> WagerResult<u128> {
        if multiplier == 0 {
            return Ok(0);
        }
        match self.reward_factor {
            Some(factor) => mul_wad2(stake, multiplier, factor),
            None => mul_wad(stake, multiplier),
        }
    }
}

/// Winnings of every side against one outcome, each side staking `amounts[i] * scale`
fn evaluate<V: Variant>(
    variant: &V,
    edge: &Edge,
    entry: &Entry,
    outcome: u128,
    scale: u128,
) -> WagerResult<u128> {
    entry
        .sides
        .iter()
        .zip(&entry.amounts)
        .try_fold(0u128, |total, (side, amount)| {
            let stake = checked_mul(*amount, scale)?;
            checked_add(total, edge.payout(stake, variant.multiplier(*side, outcome))?)
        })
}

fn fees(stake: u128, config: &GameConfig) -> WagerResult<(u128, u128)> {
    Ok((
        mul_wad(stake, config.host_fee_share)?,
        mul_wad(stake, config.protocol_fee_share)?,
    ))
}

/// Play an entry out against `entropy`, honoring its stop rules
pub fn settle_entry<V: Variant>(
    variant: &V,
    entry: &Entry,
    entropy: &Entropy,
    config: &GameConfig,
) -> WagerResult<Settlement> {
    let edge = Edge::from_config(config)?;
    let play_stake = entry.stake_per_play()?;
    let (host_per_play, protocol_per_play) = fees(play_stake, config)?;

    let mut settlement = Settlement {
        owner: entry.owner,
        ..Settlement::default()
    };

    for play in 0..entry.total_count {
        let outcome = variant.outcome(entropy, play, edge.outcome_skew)?;
        let won = evaluate(variant, &edge, entry, outcome, 1)?;

        settlement.outcomes.push(outcome);
        settlement.played += 1;
        settlement.played_stake = checked_add(settlement.played_stake, play_stake)?;
        settlement.payout = checked_add(settlement.payout, won)?;
        settlement.host_fee = checked_add(settlement.host_fee, host_per_play)?;
        settlement.protocol_fee = checked_add(settlement.protocol_fee, protocol_per_play)?;

        if settlement.played < entry.total_count && stop_rule_hit(entry, &settlement) {
            tracing::debug!(
                owner = %entry.owner,
                played = settlement.played,
                total = entry.total_count,
                "Stop rule reached"
            );
            break;
        }
    }

    let unplayed = (entry.total_count - settlement.played) as u128;
    settlement.refund = checked_mul(play_stake, unplayed)?;
    Ok(settlement)
}

fn stop_rule_hit(entry: &Entry, settlement: &Settlement) -> bool {
    let won = settlement.payout;
    let spent = settlement.played_stake;
    let gain_hit = entry.stop_gain > 0 && won >= spent.saturating_add(entry.stop_gain);
    let loss_hit = entry.stop_loss > 0 && spent >= won.saturating_add(entry.stop_loss);
    gain_hit || loss_hit
}

/// Settle a crash entry against its round's crash point.
///
/// `edge` must be the one the crash point was drawn under. Every side is
/// evaluated once with `amount * count` at stake; stop rules do not apply to
/// a single evaluation.
pub fn settle_round_entry<V: Variant>(
    variant: &V,
    entry: &Entry,
    outcome: u128,
    edge: &Edge,
    config: &GameConfig,
) -> WagerResult<Settlement> {
    let stake = entry.total_stake()?;
    let (host_fee, protocol_fee) = fees(stake, config)?;

    Ok(Settlement {
        owner: entry.owner,
        outcomes: vec![outcome],
        played: entry.total_count,
        played_stake: stake,
        payout: evaluate(variant, edge, entry, outcome, entry.total_count as u128)?,
        refund: 0,
        host_fee,
        protocol_fee,
    })
}
