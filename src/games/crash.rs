//! Crash curve
//!
//! Sides are cash-out targets in hundredths (`150` = 1.50x), strictly
//! ascending. A side wins when the round's crash point reaches it.

use crate::common::types::Entropy;
use crate::errors::{WagerError, WagerResult};
use crate::games::types::{GameKind, PpvMode, Variant};
use crate::math::{complement, from_bps, mul_div, WAD};

/// 1.00x, the floor of every crash point
pub const MIN_CRASH_POINT: u64 = 100;
/// 10_000x
pub const MAX_CRASH_POINT: u64 = 1_000_000;
/// Smallest target that can win anything
pub const MIN_TARGET: u64 = 101;
pub const MAX_SIDES: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct Crash;

impl Crash {
    /// `2^32 * 100 * (1 - skew) / (h + 1)` clamped to the curve bounds, where
    /// `h` is the low 32 bits of the entropy.
    pub fn crash_point(entropy: &Entropy, skew: u128) -> WagerResult<u64> {
        let h = entropy.low_u32() as u128;
        let scaled = mul_div(1u128 << 32, 100 * complement(skew)?, WAD)?;
        let point = scaled / (h + 1);
        Ok(point.clamp(MIN_CRASH_POINT as u128, MAX_CRASH_POINT as u128) as u64)
    }
}

impl Variant for Crash {
    fn kind(&self) -> GameKind {
        GameKind::Crash
    }

    fn outcome_space(&self) -> u128 {
        MAX_CRASH_POINT as u128 + 1
    }

    fn max_sides(&self) -> usize {
        MAX_SIDES
    }

    fn min_probability_value(&self) -> u128 {
        from_bps(100)
    }

    fn default_ppv_mode(&self) -> PpvMode {
        PpvMode::Outcome
    }

    fn supports_outcome_skew(&self) -> bool {
        true
    }

    fn validate_side(&self, side: u64) -> WagerResult<()> {
        if !(MIN_TARGET..=MAX_CRASH_POINT).contains(&side) {
            return Err(WagerError::InvalidSide(side));
        }
        Ok(())
    }

    fn validate_sides(&self, sides: &[u64]) -> WagerResult<()> {
        if sides.len() > MAX_SIDES {
            return Err(WagerError::TooManySides {
                given: sides.len(),
                max: MAX_SIDES,
            });
        }
        sides.iter().try_for_each(|side| self.validate_side(*side))?;
        if sides.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(WagerError::SidesNotAscending);
        }
        Ok(())
    }

    fn multiplier(&self, side: u64, outcome: u128) -> u128 {
        if side as u128 <= outcome {
            side as u128 * (WAD / 100)
        } else {
            0
        }
    }

    fn outcome(&self, entropy: &Entropy, _play: u32, skew: u128) -> WagerResult<u128> {
        Ok(Self::crash_point(entropy, skew)? as u128)
    }
}
