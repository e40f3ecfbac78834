//! Display price conversion for Q64.96 sqrt prices.
//!
//! Presentation only: amount computations stay in fixed point and never pass
//! through these helpers.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

use crate::error::{CoreError, Result};

/// Largest decimals value accepted for a token.
pub const MAX_TOKEN_DECIMALS: u8 = 24;

static Q96_DECIMAL: Lazy<BigDecimal> =
    Lazy::new(|| BigDecimal::from(BigInt::from(1u8) << 96usize));

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Convert a Q64.96 sqrt price to the price of token0 denominated in token1,
/// adjusted for both tokens' decimals.
///
/// # Arguments
/// * `sqrt_price_x96` - Pool sqrt price in Q64.96
/// * `decimals0` - Decimal places of token0
/// * `decimals1` - Decimal places of token1
///
/// # Example
/// ```ignore
/// // tick 0 with equal decimals is a 1:1 price
/// let price = sqrt_price_to_human_price(Q96, 18, 18)?; // 1.0
/// ```
pub fn sqrt_price_to_human_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> Result<f64> {
    if decimals0 > MAX_TOKEN_DECIMALS || decimals1 > MAX_TOKEN_DECIMALS {
        return Err(CoreError::OutOfRange(format!(
            "token decimals ({decimals0}, {decimals1}) exceed {MAX_TOKEN_DECIMALS}"
        )));
    }
    if sqrt_price_x96.is_zero() {
        return Err(CoreError::OutOfRange("sqrt price is zero".to_string()));
    }

    let sqrt_price = u256_to_big_decimal(sqrt_price_x96);

    // raw_price = (sqrtPriceX96 / Q96)^2
    let normalized = &sqrt_price / &*Q96_DECIMAL;
    let raw_price = &normalized * &normalized;

    // decimal adjustment: 10^(decimals0 - decimals1)
    let adjusted = if decimals0 >= decimals1 {
        raw_price * &POW10_CACHE[(decimals0 - decimals1) as usize]
    } else {
        raw_price / &POW10_CACHE[(decimals1 - decimals0) as usize]
    };

    adjusted
        .to_f64()
        .filter(|p| p.is_finite())
        .ok_or(CoreError::ArithmeticOverflow("sqrt_price_to_human_price"))
}

/// Convert U256 to BigDecimal via little-endian bytes.
fn u256_to_big_decimal(value: U256) -> BigDecimal {
    let bytes: [u8; 32] = value.to_le_bytes();
    BigDecimal::from(BigInt::from_bytes_le(Sign::Plus, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{full_math::Q96, tick_math::tick_to_sqrt_price};

    #[test]
    fn test_tick_zero_equal_decimals() {
        let price = sqrt_price_to_human_price(Q96, 18, 18).unwrap();
        assert!((price - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decimal_adjustment() {
        // WETH (18) / USDC (6) shaped pool near tick -200000
        let sqrt = tick_to_sqrt_price(-200000).unwrap();
        let raw = 1.0001f64.powi(-200000);
        let price = sqrt_price_to_human_price(sqrt, 18, 6).unwrap();
        let expected = raw * 1e12;
        assert!((price - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn test_price_increases_with_tick() {
        let low = sqrt_price_to_human_price(tick_to_sqrt_price(100).unwrap(), 6, 6).unwrap();
        let high = sqrt_price_to_human_price(tick_to_sqrt_price(200).unwrap(), 6, 6).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_rejects_zero_and_bad_decimals() {
        assert!(sqrt_price_to_human_price(U256::ZERO, 18, 18).is_err());
        assert!(sqrt_price_to_human_price(Q96, 30, 18).is_err());
    }
}
