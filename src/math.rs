//! Fixed-point arithmetic over an 18-decimal scale
//!
//! Shares, probability values and multipliers are `u128` values where
//! `WAD` represents 1.0. Products are taken in 256 bits and must fit back
//! into `u128`.

use crate::errors::{WagerError, WagerResult};
use primitive_types::U256;

/// 1.0 in 18-decimal fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// `a * b / denominator`, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> WagerResult<u128> {
    if denominator == 0 {
        return Err(WagerError::ArithmeticOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(WagerError::ArithmeticOverflow)?;
    narrow(product / U256::from(denominator))
}

/// `a * b / WAD`
pub fn mul_wad(a: u128, b: u128) -> WagerResult<u128> {
    mul_div(a, b, WAD)
}

/// `amount * x * y / WAD^2` without intermediate rounding
pub fn mul_wad2(amount: u128, x: u128, y: u128) -> WagerResult<u128> {
    let product = U256::from(amount)
        .checked_mul(U256::from(x))
        .and_then(|p| p.checked_mul(U256::from(y)))
        .ok_or(WagerError::ArithmeticOverflow)?;
    narrow(product / (U256::from(WAD) * U256::from(WAD)))
}

/// `WAD - fraction`; fails when the fraction exceeds 1.0
pub fn complement(fraction: u128) -> WagerResult<u128> {
    WAD.checked_sub(fraction).ok_or(WagerError::ArithmeticOverflow)
}

/// Ratio `numerator / denominator` as a WAD value
pub fn ratio(numerator: u128, denominator: u128) -> WagerResult<u128> {
    mul_div(numerator, WAD, denominator)
}

/// Whole multiplier (e.g. `2` for 2x) as a WAD value
pub const fn whole(multiplier: u128) -> u128 {
    multiplier * WAD
}

/// Basis points (1/10_000) as a WAD value
pub const fn from_bps(bps: u128) -> u128 {
    bps * (WAD / 10_000)
}

pub fn checked_add(a: u128, b: u128) -> WagerResult<u128> {
    a.checked_add(b).ok_or(WagerError::ArithmeticOverflow)
}

pub fn checked_mul(a: u128, b: u128) -> WagerResult<u128> {
    a.checked_mul(b).ok_or(WagerError::ArithmeticOverflow)
}

fn narrow(value: U256) -> WagerResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(WagerError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}
