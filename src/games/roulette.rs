//! Single-zero roulette
//!
//! Sides `0..=36` are straight bets. Outside bets are encoded above 36 and
//! always lose on zero.

use crate::errors::{WagerError, WagerResult};
use crate::games::types::{GameKind, Variant};
use crate::math::{from_bps, whole};

pub const POCKETS: u128 = 37;

pub const RED: u64 = 37;
pub const BLACK: u64 = 38;
pub const ODD: u64 = 39;
pub const EVEN: u64 = 40;
pub const LOW: u64 = 41;
pub const HIGH: u64 = 42;
pub const FIRST_DOZEN: u64 = 43;
pub const THIRD_DOZEN: u64 = 45;
pub const FIRST_COLUMN: u64 = 46;
pub const THIRD_COLUMN: u64 = 48;

const RED_POCKETS: [u128; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

pub fn is_red(pocket: u128) -> bool {
    RED_POCKETS.contains(&pocket)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Roulette;

impl Roulette {
    fn covers(side: u64, pocket: u128) -> bool {
        if side <= 36 {
            return pocket == side as u128;
        }
        if pocket == 0 {
            return false;
        }
        match side {
            RED => is_red(pocket),
            BLACK => !is_red(pocket),
            ODD => pocket % 2 == 1,
            EVEN => pocket % 2 == 0,
            LOW => pocket <= 18,
            HIGH => pocket >= 19,
            FIRST_DOZEN..=THIRD_DOZEN => {
                let dozen = (side - FIRST_DOZEN) as u128;
                (pocket - 1) / 12 == dozen
            }
            FIRST_COLUMN..=THIRD_COLUMN => {
                let column = (side - FIRST_COLUMN) as u128;
                (pocket - 1) % 3 == column
            }
            _ => false,
        }
    }

    fn payout_multiple(side: u64) -> u128 {
        match side {
            0..=36 => 36,
            RED..=HIGH => 2,
            _ => 3,
        }
    }
}

impl Variant for Roulette {
    fn kind(&self) -> GameKind {
        GameKind::Roulette
    }

    fn outcome_space(&self) -> u128 {
        POCKETS
    }

    fn min_probability_value(&self) -> u128 {
        from_bps(10)
    }

    fn validate_side(&self, side: u64) -> WagerResult<()> {
        if side > THIRD_COLUMN {
            return Err(WagerError::InvalidSide(side));
        }
        Ok(())
    }

    fn multiplier(&self, side: u64, outcome: u128) -> u128 {
        if Self::covers(side, outcome) {
            whole(Self::payout_multiple(side))
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_bet() {
        let game = Roulette;
        assert_eq!(game.multiplier(17, 17), whole(36));
        assert_eq!(game.multiplier(17, 18), 0);
        assert_eq!(game.multiplier(0, 0), whole(36));
    }

    #[test]
    fn test_zero_loses_outside_bets() {
        let game = Roulette;
        for side in RED..=THIRD_COLUMN {
            assert_eq!(game.multiplier(side, 0), 0, "side {} should lose on zero", side);
        }
    }

    #[test]
    fn test_outside_bets() {
        let game = Roulette;
        assert_eq!(game.multiplier(RED, 1), whole(2));
        assert_eq!(game.multiplier(BLACK, 2), whole(2));
        assert_eq!(game.multiplier(EVEN, 2), whole(2));
        assert_eq!(game.multiplier(HIGH, 19), whole(2));
        assert_eq!(game.multiplier(LOW, 19), 0);
        // second dozen covers 13..=24
        assert_eq!(game.multiplier(FIRST_DOZEN + 1, 13), whole(3));
        assert_eq!(game.multiplier(FIRST_DOZEN + 1, 25), 0);
        // third column covers 3, 6, ..., 36
        assert_eq!(game.multiplier(THIRD_COLUMN, 36), whole(3));
        assert_eq!(game.multiplier(FIRST_COLUMN, 34), whole(3));
    }

    #[test]
    fn test_every_pocket_has_one_colour_and_one_dozen() {
        for pocket in 1..POCKETS {
            let colours = [RED, BLACK].iter().filter(|s| Roulette::covers(**s, pocket)).count();
            let dozens = (FIRST_DOZEN..=THIRD_DOZEN).filter(|s| Roulette::covers(*s, pocket)).count();
            let columns = (FIRST_COLUMN..=THIRD_COLUMN).filter(|s| Roulette::covers(*s, pocket)).count();
            assert_eq!((colours, dozens, columns), (1, 1, 1), "pocket {}", pocket);
        }
    }

    #[test]
    fn test_side_range() {
        assert!(Roulette.validate_side(THIRD_COLUMN).is_ok());
        assert_eq!(Roulette.validate_side(49), Err(WagerError::InvalidSide(49)));
    }
}
