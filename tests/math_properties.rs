// Property tests for the pool math.

use alloy::primitives::U256;
use concentra::utils::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Property: tick_to_sqrt_price is strictly increasing
    #[test]
    fn prop_sqrt_price_strictly_increasing(tick in MIN_TICK..MAX_TICK) {
        let lower = tick_to_sqrt_price(tick).unwrap();
        let upper = tick_to_sqrt_price(tick + 1).unwrap();
        prop_assert!(lower < upper);
    }

    /// Property: sqrt_price_to_tick inverts tick_to_sqrt_price
    #[test]
    fn prop_tick_round_trip(tick in MIN_TICK..MAX_TICK) {
        let sqrt = tick_to_sqrt_price(tick).unwrap();
        prop_assert_eq!(sqrt_price_to_tick(sqrt).unwrap(), tick);
    }

    /// Property: below the range only token0 is held, above it only token1
    #[test]
    fn prop_single_sided_outside_range(
        lower in -100_000i32..100_000,
        width in 1i32..50_000,
        gap in 0i32..10_000,
        liquidity in 1u128..u128::MAX >> 8,
    ) {
        let upper = lower + width;

        let below = tick_to_sqrt_price(lower - gap).unwrap();
        let (_, amount1) = get_token_amounts(liquidity, lower, upper, below).unwrap();
        prop_assert_eq!(amount1, U256::ZERO);

        let above = tick_to_sqrt_price(upper + gap).unwrap();
        let (amount0, _) = get_token_amounts(liquidity, lower, upper, above).unwrap();
        prop_assert_eq!(amount0, U256::ZERO);
    }

    /// Property: amounts never grow when liquidity shrinks
    #[test]
    fn prop_amounts_monotonic_in_liquidity(
        tick in -50_000i32..50_000,
        liquidity in 2u128..u128::MAX >> 8,
    ) {
        let sqrt = tick_to_sqrt_price(tick).unwrap();
        let (a0, a1) = get_token_amounts(liquidity, -60_000, 60_000, sqrt).unwrap();
        let (h0, h1) = get_token_amounts(liquidity / 2, -60_000, 60_000, sqrt).unwrap();
        prop_assert!(h0 <= a0);
        prop_assert!(h1 <= a1);
    }

    /// Property: min amount stays within the tolerance band
    #[test]
    fn prop_min_amount_bounded(desired in any::<u128>(), bps in 0u32..10_000) {
        let desired = U256::from(desired);
        let tolerance = bps as f64 / 100.0;
        let min = get_min_amount(desired, tolerance).unwrap();

        prop_assert!(min <= desired);
        let max_loss = desired * U256::from(bps) / U256::from(10_000u32) + U256::from(1u8);
        prop_assert!(desired - min <= max_loss);
    }

    /// Property: three-decimal tolerances give the exact floored minimum
    #[test]
    fn prop_min_amount_exact_for_decimal_tolerance(desired in any::<u128>(), milli in 0u32..100_000) {
        let tolerance = milli as f64 / 1000.0;
        let min = get_min_amount(U256::from(desired), tolerance).unwrap();

        let expected = U256::from(desired) * U256::from(100_000 - milli) / U256::from(100_000u32);
        prop_assert_eq!(min, expected);
    }

    /// Property: a larger tolerance never raises the minimum
    #[test]
    fn prop_min_amount_monotonic_in_tolerance(
        desired in any::<u128>(),
        a in 0.0f64..100.0,
        b in 0.0f64..100.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let desired = U256::from(desired);
        prop_assert!(get_min_amount(desired, high).unwrap() <= get_min_amount(desired, low).unwrap());
    }

    /// Property: tolerances outside [0, 100) are rejected
    #[test]
    fn prop_invalid_tolerance_rejected(tolerance in 100.0f64..1e9) {
        prop_assert!(get_min_amount(U256::from(1000u32), tolerance).is_err());
        prop_assert!(get_min_amount(U256::from(1000u32), -tolerance).is_err());
    }
}

#[test]
fn test_domain_boundaries() {
    assert_eq!(tick_to_sqrt_price(0).unwrap(), Q96);
    assert_eq!(tick_to_sqrt_price(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
    assert!(tick_to_sqrt_price(MAX_TICK + 1).is_err());
    assert!(tick_to_sqrt_price(MIN_TICK - 1).is_err());
}

#[test]
fn test_liquidity_round_trip_rounds_down() {
    let liquidity = 1_000_000_000_000_000_000u128;
    let sqrt = tick_to_sqrt_price(0).unwrap();
    let (a0, a1) = get_token_amounts(liquidity, -600, 600, sqrt).unwrap();
    let back = get_liquidity_for_amounts(sqrt, -600, 600, a0, a1).unwrap();
    assert!(back <= liquidity);
    assert_eq!(back, 999_999_999_999_999_976);
}
