//! Liquidity <-> token amount conversion over a tick range.
//!
//! All divisions truncate, so an amount is never overstated. Products are
//! taken through `mul_div` with a 512-bit intermediate.

use alloy::primitives::U256;

use crate::error::{CoreError, Result};
use crate::utils::full_math::{mul_div, Q96, RESOLUTION};
use crate::utils::tick_math::tick_to_sqrt_price;

/// amount0 = L * (sqrt_b - sqrt_a) * 2^96 / (sqrt_b * sqrt_a)
pub fn get_amount0_for_liquidity(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> Result<U256> {
    let (sqrt_a, sqrt_b) = ordered(sqrt_a, sqrt_b);
    if sqrt_a.is_zero() {
        return Err(CoreError::OutOfRange("sqrt price is zero".to_string()));
    }

    let numerator = U256::from(liquidity) << RESOLUTION;
    Ok(mul_div(numerator, sqrt_b - sqrt_a, sqrt_b)? / sqrt_a)
}

/// amount1 = L * (sqrt_b - sqrt_a) / 2^96
pub fn get_amount1_for_liquidity(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> Result<U256> {
    let (sqrt_a, sqrt_b) = ordered(sqrt_a, sqrt_b);
    mul_div(U256::from(liquidity), sqrt_b - sqrt_a, Q96)
}

/// Token amounts held by `liquidity` over `[tick_lower, tick_upper)` at the
/// given pool sqrt price. Returns `(amount0, amount1)`.
///
/// Below the range the position is entirely token0, at or above it entirely
/// token1.
pub fn get_token_amounts(
    liquidity: u128,
    tick_lower: i32,
    tick_upper: i32,
    current_sqrt_price: U256,
) -> Result<(U256, U256)> {
    if tick_lower >= tick_upper {
        return Err(CoreError::OutOfRange(format!(
            "tick_lower {tick_lower} must be below tick_upper {tick_upper}"
        )));
    }

    let sqrt_a = tick_to_sqrt_price(tick_lower)?;
    let sqrt_b = tick_to_sqrt_price(tick_upper)?;

    if current_sqrt_price <= sqrt_a {
        Ok((get_amount0_for_liquidity(sqrt_a, sqrt_b, liquidity)?, U256::ZERO))
    } else if current_sqrt_price >= sqrt_b {
        Ok((U256::ZERO, get_amount1_for_liquidity(sqrt_a, sqrt_b, liquidity)?))
    } else {
        Ok((
            get_amount0_for_liquidity(current_sqrt_price, sqrt_b, liquidity)?,
            get_amount1_for_liquidity(sqrt_a, current_sqrt_price, liquidity)?,
        ))
    }
}

/// Maximum liquidity mintable from the given amounts at the current price,
/// rounded down. Inverse of [`get_token_amounts`], used for range previews.
pub fn get_liquidity_for_amounts(
    current_sqrt_price: U256,
    tick_lower: i32,
    tick_upper: i32,
    amount0: U256,
    amount1: U256,
) -> Result<u128> {
    if tick_lower >= tick_upper {
        return Err(CoreError::OutOfRange(format!(
            "tick_lower {tick_lower} must be below tick_upper {tick_upper}"
        )));
    }

    let sqrt_a = tick_to_sqrt_price(tick_lower)?;
    let sqrt_b = tick_to_sqrt_price(tick_upper)?;

    let liquidity = if current_sqrt_price <= sqrt_a {
        liquidity_for_amount0(sqrt_a, sqrt_b, amount0)?
    } else if current_sqrt_price < sqrt_b {
        let l0 = liquidity_for_amount0(current_sqrt_price, sqrt_b, amount0)?;
        let l1 = liquidity_for_amount1(sqrt_a, current_sqrt_price, amount1)?;
        l0.min(l1)
    } else {
        liquidity_for_amount1(sqrt_a, sqrt_b, amount1)?
    };

    if liquidity > U256::from(u128::MAX) {
        return Err(CoreError::ArithmeticOverflow("get_liquidity_for_amounts"));
    }
    Ok(liquidity.to::<u128>())
}

fn liquidity_for_amount0(sqrt_a: U256, sqrt_b: U256, amount0: U256) -> Result<U256> {
    let intermediate = mul_div(sqrt_a, sqrt_b, Q96)?;
    mul_div(amount0, intermediate, sqrt_b - sqrt_a)
}

fn liquidity_for_amount1(sqrt_a: U256, sqrt_b: U256, amount1: U256) -> Result<U256> {
    mul_div(amount1, Q96, sqrt_b - sqrt_a)
}

#[inline]
fn ordered(a: U256, b: U256) -> (U256, U256) {
    if a > b { (b, a) } else { (a, b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_E18: u128 = 1_000_000_000_000_000_000;

    fn sqrt(tick: i32) -> U256 {
        tick_to_sqrt_price(tick).unwrap()
    }

    #[test]
    fn test_in_range_symmetric() {
        let (a0, a1) = get_token_amounts(ONE_E18, -600, 600, sqrt(0)).unwrap();
        assert_eq!(a0, U256::from(29553010879137169u64));
        assert_eq!(a1, U256::from(29553010879137169u64));
    }

    #[test]
    fn test_below_range_all_token0() {
        let (a0, a1) = get_token_amounts(ONE_E18, -600, 600, sqrt(-1200)).unwrap();
        assert_eq!(a0, U256::from(60005999255049926u64));
        assert_eq!(a1, U256::ZERO);
    }

    #[test]
    fn test_above_range_all_token1() {
        let (a0, a1) = get_token_amounts(ONE_E18, -600, 600, sqrt(1200)).unwrap();
        assert_eq!(a0, U256::ZERO);
        assert_eq!(a1, U256::from(60005999255049926u64));
    }

    #[test]
    fn test_boundaries_are_single_sided() {
        let (_, a1) = get_token_amounts(ONE_E18, -600, 600, sqrt(-600)).unwrap();
        assert_eq!(a1, U256::ZERO);
        let (a0, _) = get_token_amounts(ONE_E18, -600, 600, sqrt(600)).unwrap();
        assert_eq!(a0, U256::ZERO);
    }

    #[test]
    fn test_asymmetric_in_range() {
        let (a0, a1) = get_token_amounts(ONE_E18, -60, 60, sqrt(10)).unwrap();
        assert_eq!(a0, U256::from(2495504920917779u64));
        assert_eq!(a1, U256::from(3495454965911280u64));
    }

    #[test]
    fn test_wide_range_large_liquidity() {
        let (a0, a1) =
            get_token_amounts(12345678901234567890, -887220, 887220, sqrt(85176)).unwrap();
        assert_eq!(a0, U256::from(174595927797806903u64));
        assert_eq!(a1, "872963014973037986909".parse::<U256>().unwrap());
    }

    #[test]
    fn test_max_liquidity_full_range_does_not_overflow() {
        let result = get_token_amounts(u128::MAX, -887272, 887272, sqrt(0));
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_liquidity() {
        let (a0, a1) = get_token_amounts(0, -600, 600, sqrt(0)).unwrap();
        assert_eq!((a0, a1), (U256::ZERO, U256::ZERO));
    }

    #[test]
    fn test_invalid_range() {
        assert!(get_token_amounts(ONE_E18, 600, -600, sqrt(0)).is_err());
        assert!(get_token_amounts(ONE_E18, -900000, 600, sqrt(0)).is_err());
    }

    #[test]
    fn test_liquidity_for_amounts_roundtrip_rounds_down() {
        let price = sqrt(0);
        let (a0, a1) = get_token_amounts(ONE_E18, -600, 600, price).unwrap();
        let liquidity = get_liquidity_for_amounts(price, -600, 600, a0, a1).unwrap();
        assert!(liquidity <= ONE_E18);
        assert!(ONE_E18 - liquidity < ONE_E18 / 1_000_000);
    }
}
