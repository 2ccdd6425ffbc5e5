use crate::common::types::Entropy;
use crate::errors::{WagerError, WagerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game variants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    CoinFlip,
    Roulette,
    RollOver,
    Crash,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::CoinFlip => write!(f, "coinflip"),
            GameKind::Roulette => write!(f, "roulette"),
            GameKind::RollOver => write!(f, "rollover"),
            GameKind::Crash => write!(f, "crash"),
        }
    }
}

/// Where a variant takes its house edge from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PpvMode {
    /// Winning payouts are scaled by `1 - probability_value`
    #[default]
    Reward,
    /// Payouts are left unskewed; the variant folds the edge into its outcome derivation
    Outcome,
}

/// Win rule of one game variant.
///
/// Multipliers are 18-decimal fixed point; `0` means the side lost.
pub trait Variant {
    fn kind(&self) -> GameKind;

    /// Number of distinct per-play outcomes
    fn outcome_space(&self) -> u128;

    /// Most sides one entry may carry
    fn max_sides(&self) -> usize {
        1
    }

    /// Lowest probability value this variant may be configured with
    fn min_probability_value(&self) -> u128;

    fn default_ppv_mode(&self) -> PpvMode {
        PpvMode::Reward
    }

    /// Whether [`Variant::outcome`] (or the variant's own curve) honors a
    /// non-zero skew. Variants that don't may only run in [`PpvMode::Reward`].
    fn supports_outcome_skew(&self) -> bool {
        false
    }

    fn validate_side(&self, side: u64) -> WagerResult<()>;

    /// Payout multiplier of `side` against `outcome`
    fn multiplier(&self, side: u64, outcome: u128) -> u128;

    /// Outcome of play `play`. `skew` is the probability value when the edge is
    /// taken from outcomes, zero otherwise.
    fn outcome(&self, entropy: &Entropy, play: u32, _skew: u128) -> WagerResult<u128> {
        Ok(entropy.derive_index(play, self.outcome_space()))
    }

    fn validate_sides(&self, sides: &[u64]) -> WagerResult<()> {
        if sides.len() > self.max_sides() {
            return Err(WagerError::TooManySides {
                given: sides.len(),
                max: self.max_sides(),
            });
        }
        sides.iter().try_for_each(|side| self.validate_side(*side))
    }
}

/// Configuration bounds a variant imposes on its [`GameConfig`](crate::config::GameConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRules {
    pub min_probability_value: u128,
    pub outcome_skew: bool,
}

impl VariantRules {
    pub fn of<V: Variant>(variant: &V) -> Self {
        Self {
            min_probability_value: variant.min_probability_value(),
            outcome_skew: variant.supports_outcome_skew(),
        }
    }

    /// Bounds that hold for any variant
    pub fn any() -> Self {
        Self {
            min_probability_value: 0,
            outcome_skew: true,
        }
    }
}
