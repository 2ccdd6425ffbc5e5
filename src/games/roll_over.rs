use crate::errors::{WagerError, WagerResult};
use crate::games::types::{GameKind, Variant};
use crate::math::{from_bps, WAD};

/// Lowest accepted roll-over target
pub const MIN_TARGET: u64 = 1;
/// Highest accepted roll-over target (25x payout)
pub const MAX_TARGET: u64 = 95;

/// Percentile roll: the play wins when the roll (0..=99) lands above the target
#[derive(Debug, Clone, Copy, Default)]
pub struct RollOver;

impl RollOver {
    /// `100 / (99 - target)`: the inverse of the win probability
    pub fn fair_multiplier(target: u64) -> u128 {
        let winning_rolls = 99u128.saturating_sub(target as u128).max(1);
        WAD * 100 / winning_rolls
    }
}

impl Variant for RollOver {
    fn kind(&self) -> GameKind {
        GameKind::RollOver
    }

    fn outcome_space(&self) -> u128 {
        100
    }

    fn min_probability_value(&self) -> u128 {
        from_bps(10)
    }

    fn validate_side(&self, side: u64) -> WagerResult<()> {
        if !(MIN_TARGET..=MAX_TARGET).contains(&side) {
            return Err(WagerError::InvalidSide(side));
        }
        Ok(())
    }

    fn multiplier(&self, side: u64, outcome: u128) -> u128 {
        if outcome > side as u128 {
            Self::fair_multiplier(side)
        } else {
            0
        }
    }
}
