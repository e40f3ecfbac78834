//! Tick math for concentrated-liquidity pools.
//!
//! Implements tick-to-sqrt-price conversion in Q64.96 fixed point using the
//! same bit-decomposition as Uniswap V3's TickMath.sol. Integer-only, so the
//! result is identical on every platform and matches the on-chain value.

use alloy::primitives::U256;

use crate::error::{CoreError, Result};

// ============================================
// Domain Constants
// ============================================

/// Minimum tick (log base sqrt(1.0001) of 2^-128).
pub const MIN_TICK: i32 = -887272;

/// Maximum tick (log base sqrt(1.0001) of 2^128).
pub const MAX_TICK: i32 = 887272;

/// `tick_to_sqrt_price(MIN_TICK)`.
pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);

/// `tick_to_sqrt_price(MAX_TICK)`.
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([0x5d951d5263988d26, 0xefd1fc6a50648849, 0xfffd8963, 0]);

// Q128 multipliers: 1/sqrt(1.0001)^(2^i) * 2^128 for i = 0..19
const TICK_MULTIPLIERS: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
    0x48a170391f7dc42444e8fa2,
];

// ============================================
// Tick to Price Conversion
// ============================================

/// Convert a tick to its sqrt price ratio (Q64.96 format).
///
/// Formula: sqrt(1.0001^tick) * 2^96
/// Valid tick range: -887272 to 887272. Ticks outside the range are rejected,
/// never clamped.
pub fn tick_to_sqrt_price(tick: i32) -> Result<U256> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(CoreError::OutOfRange(format!(
            "tick {tick} outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }

    let abs_tick = tick.unsigned_abs();

    // Accumulate the product for a negative tick in Q128
    let mut ratio: U256 = if abs_tick & 0x1 != 0 {
        U256::from(TICK_MULTIPLIERS[0])
    } else {
        U256::from(1u8) << 128
    };

    for (bit, multiplier) in TICK_MULTIPLIERS.iter().enumerate().skip(1) {
        if abs_tick & (1 << bit) != 0 {
            ratio = (ratio * U256::from(*multiplier)) >> 128;
        }
    }

    // For positive ticks, take reciprocal
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128 -> Q96, rounding up so the result is never below the true price
    let remainder: U256 = ratio % (U256::from(1u8) << 32);
    let sqrt_price = (ratio >> 32) + if remainder.is_zero() { U256::ZERO } else { U256::from(1u8) };

    Ok(sqrt_price)
}

/// Greatest tick whose sqrt price is less than or equal to `sqrt_price_x96`.
///
/// The input must lie in `[MIN_SQRT_RATIO, MAX_SQRT_RATIO)`.
pub fn sqrt_price_to_tick(sqrt_price_x96: U256) -> Result<i32> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(CoreError::OutOfRange(format!(
            "sqrt price {sqrt_price_x96} outside [MIN_SQRT_RATIO, MAX_SQRT_RATIO)"
        )));
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK - 1;

    while low < high {
        // Upper midpoint so the loop always makes progress
        let mid = low + (high - low + 1) / 2;
        if tick_to_sqrt_price(mid)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Ok(low)
}

// ============================================
// Range Validation
// ============================================

/// Validate a position's tick range against the domain and the pool's tick spacing.
pub fn validate_tick_range(tick_lower: i32, tick_upper: i32, tick_spacing: i32) -> Result<()> {
    if tick_spacing <= 0 {
        return Err(CoreError::OutOfRange(format!(
            "tick spacing {tick_spacing} must be positive"
        )));
    }
    if tick_lower >= tick_upper {
        return Err(CoreError::OutOfRange(format!(
            "tick_lower {tick_lower} must be below tick_upper {tick_upper}"
        )));
    }
    if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(CoreError::OutOfRange(format!(
            "range [{tick_lower}, {tick_upper}] outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }
    if tick_lower % tick_spacing != 0 || tick_upper % tick_spacing != 0 {
        return Err(CoreError::OutOfRange(format!(
            "range [{tick_lower}, {tick_upper}] not aligned to tick spacing {tick_spacing}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::full_math::Q96;

    fn u(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn test_tick_zero_is_q96() {
        assert_eq!(tick_to_sqrt_price(0).unwrap(), Q96);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(
            tick_to_sqrt_price(1).unwrap(),
            u("79232123823359799118286999568")
        );
        assert_eq!(
            tick_to_sqrt_price(-1).unwrap(),
            u("79224201403219477170569942574")
        );
        assert_eq!(
            tick_to_sqrt_price(60).unwrap(),
            u("79466191966197645195421774833")
        );
        assert_eq!(
            tick_to_sqrt_price(-200000).unwrap(),
            u("3598751819609688046946419")
        );
        assert_eq!(
            tick_to_sqrt_price(200000).unwrap(),
            u("1744244129640337381386292603617838")
        );
    }

    #[test]
    fn test_domain_boundaries() {
        assert_eq!(tick_to_sqrt_price(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(tick_to_sqrt_price(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(
            MAX_SQRT_RATIO,
            u("1461446703485210103287273052203988822378723970342")
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            tick_to_sqrt_price(MAX_TICK + 1),
            Err(CoreError::OutOfRange(_))
        ));
        assert!(matches!(
            tick_to_sqrt_price(MIN_TICK - 1),
            Err(CoreError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_sqrt_price_to_tick_inverse() {
        for tick in [MIN_TICK, -200000, -60, -1, 0, 1, 60, 85176, 200000, MAX_TICK - 1] {
            let sqrt = tick_to_sqrt_price(tick).unwrap();
            assert_eq!(sqrt_price_to_tick(sqrt).unwrap(), tick);
        }
    }

    #[test]
    fn test_sqrt_price_to_tick_between_ticks() {
        let sqrt = tick_to_sqrt_price(100).unwrap() + U256::from(1u8);
        assert_eq!(sqrt_price_to_tick(sqrt).unwrap(), 100);
        let sqrt = tick_to_sqrt_price(101).unwrap() - U256::from(1u8);
        assert_eq!(sqrt_price_to_tick(sqrt).unwrap(), 100);
    }

    #[test]
    fn test_sqrt_price_to_tick_bounds() {
        assert!(sqrt_price_to_tick(MAX_SQRT_RATIO).is_err());
        assert!(sqrt_price_to_tick(MIN_SQRT_RATIO - U256::from(1u8)).is_err());
    }

    #[test]
    fn test_validate_tick_range() {
        assert!(validate_tick_range(-600, 600, 60).is_ok());
        assert!(validate_tick_range(600, -600, 60).is_err());
        assert!(validate_tick_range(-600, -600, 60).is_err());
        assert!(validate_tick_range(-610, 600, 60).is_err());
        assert!(validate_tick_range(-887280, 600, 60).is_err());
        assert!(validate_tick_range(-600, 600, 0).is_err());
    }
}
