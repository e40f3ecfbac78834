use alloy::primitives::{Address, U256};

use crate::{
    error::{CoreError, Result},
    utils::{sqrt_price_to_human_price, MAX_SQRT_RATIO, MIN_SQRT_RATIO},
};

/// Concentrated-liquidity pool state snapshot.
///
/// Read-only: a newer snapshot supersedes this one, it is never patched.
/// `tick` is the pool's current tick and need not be a multiple of
/// `tick_spacing` (spacing constrains position boundaries only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// Fee in hundredths of a bip (3000 = 0.3%)
    pub fee: u32,
    pub tick_spacing: i32,
    pub tick: i32,
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
}

impl PoolState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        token0: Address,
        token1: Address,
        fee: u32,
        tick_spacing: i32,
        tick: i32,
        sqrt_price_x96: U256,
        liquidity: u128,
    ) -> Result<Self> {
        if token0 >= token1 {
            return Err(CoreError::InvalidPoolState(format!(
                "tokens not canonically ordered: {token0} >= {token1}"
            )));
        }
        if tick_spacing <= 0 {
            return Err(CoreError::InvalidPoolState(format!(
                "tick spacing {tick_spacing} must be positive"
            )));
        }
        if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(CoreError::InvalidPoolState(format!(
                "sqrt price {sqrt_price_x96} outside valid ratio range"
            )));
        }

        Ok(Self {
            address,
            token0,
            token1,
            fee,
            tick_spacing,
            tick,
            sqrt_price_x96,
            liquidity,
        })
    }

    /// Price of token0 in token1, decimal-adjusted. Display only.
    pub fn human_price(&self, decimals0: u8, decimals1: u8) -> Result<f64> {
        sqrt_price_to_human_price(self.sqrt_price_x96, decimals0, decimals1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Q96;
    use alloy::primitives::address;

    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

    #[test]
    fn test_rejects_unordered_tokens() {
        let err = PoolState::new(Address::ZERO, WETH, USDC, 3000, 60, 0, Q96, 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPoolState(_)));
    }

    #[test]
    fn test_unaligned_current_tick_is_allowed() {
        let pool = PoolState::new(Address::ZERO, USDC, WETH, 3000, 60, 7, Q96, 1).unwrap();
        assert_eq!(pool.tick, 7);
    }

    #[test]
    fn test_rejects_bad_spacing_and_price() {
        assert!(PoolState::new(Address::ZERO, USDC, WETH, 3000, 0, 0, Q96, 0).is_err());
        assert!(PoolState::new(Address::ZERO, USDC, WETH, 3000, 60, 0, U256::ZERO, 0).is_err());
    }
}
