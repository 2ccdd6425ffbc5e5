use crate::errors::{WagerError, WagerResult};
use crate::games::types::{GameKind, Variant};
use crate::math::{from_bps, whole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coin flip choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinChoice {
    Heads,
    Tails,
}

impl CoinChoice {
    pub fn side(self) -> u64 {
        match self {
            CoinChoice::Heads => 0,
            CoinChoice::Tails => 1,
        }
    }

    pub fn from_outcome(outcome: u128) -> Self {
        if outcome % 2 == 0 {
            CoinChoice::Heads
        } else {
            CoinChoice::Tails
        }
    }
}

impl fmt::Display for CoinChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinChoice::Heads => write!(f, "heads"),
            CoinChoice::Tails => write!(f, "tails"),
        }
    }
}

/// 50/50 flip paying 2x on an exact match
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlip;

impl Variant for CoinFlip {
    fn kind(&self) -> GameKind {
        GameKind::CoinFlip
    }

    fn outcome_space(&self) -> u128 {
        2
    }

    fn min_probability_value(&self) -> u128 {
        from_bps(10)
    }

    fn validate_side(&self, side: u64) -> WagerResult<()> {
        if side > 1 {
            return Err(WagerError::InvalidSide(side));
        }
        Ok(())
    }

    fn multiplier(&self, side: u64, outcome: u128) -> u128 {
        if CoinChoice::from_outcome(outcome).side() == side {
            whole(2)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinflip_win_rule() {
        let game = CoinFlip;
        assert_eq!(game.multiplier(CoinChoice::Heads.side(), 0), whole(2));
        assert_eq!(game.multiplier(CoinChoice::Tails.side(), 0), 0);
        assert_eq!(game.multiplier(CoinChoice::Tails.side(), 1), whole(2));
    }

    #[test]
    fn test_coinflip_sides() {
        let game = CoinFlip;
        assert!(game.validate_sides(&[0]).is_ok());
        assert_eq!(game.validate_sides(&[2]), Err(WagerError::InvalidSide(2)));
        assert!(matches!(
            game.validate_sides(&[0, 1]),
            Err(WagerError::TooManySides { given: 2, max: 1 })
        ));
    }
}
