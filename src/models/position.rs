use alloy::primitives::{Address, U256};

use crate::{
    error::{CoreError, Result},
    models::PoolState,
    utils::{get_token_amounts, validate_tick_range},
};

/// Liquidity position owned by a position-manager NFT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub token_id: U256,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

impl Position {
    /// Check the position belongs to `pool` and its range is valid for the
    /// pool's tick spacing.
    pub fn validate_against(&self, pool: &PoolState) -> Result<()> {
        if self.token0 != pool.token0 || self.token1 != pool.token1 || self.fee != pool.fee {
            return Err(CoreError::PoolMismatch(format!(
                "position {} is ({}, {}, {}), pool {} is ({}, {}, {})",
                self.token_id,
                self.token0,
                self.token1,
                self.fee,
                pool.address,
                pool.token0,
                pool.token1,
                pool.fee
            )));
        }
        validate_tick_range(self.tick_lower, self.tick_upper, pool.tick_spacing)
    }

    /// Token amounts withdrawable for `liquidity` at `sqrt_price_x96`.
    pub fn amounts_for(&self, liquidity: u128, sqrt_price_x96: U256) -> Result<(U256, U256)> {
        get_token_amounts(liquidity, self.tick_lower, self.tick_upper, sqrt_price_x96)
    }

    pub fn in_range(&self, current_tick: i32) -> bool {
        self.tick_lower <= current_tick && current_tick < self.tick_upper
    }
}

/// A position together with the token amounts it held at a pool price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub chain_id: u64,
    pub position: Position,
    pub sqrt_price_x96: U256,
    pub amount0: U256,
    pub amount1: U256,
}

impl PositionSnapshot {
    /// Validate `position` against `pool` and compute its amounts at the pool price.
    pub fn capture(chain_id: u64, position: Position, pool: &PoolState) -> Result<Self> {
        position.validate_against(pool)?;
        let (amount0, amount1) = position.amounts_for(position.liquidity, pool.sqrt_price_x96)?;

        Ok(Self {
            chain_id,
            position,
            sqrt_price_x96: pool.sqrt_price_x96,
            amount0,
            amount1,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_capture_computes_amounts() {
        let snapshot =
            PositionSnapshot::capture(1, position(1_000_000_000_000_000_000), &pool_at_tick(0))
                .unwrap();
        assert_eq!(snapshot.amount0, U256::from(29553010879137169u64));
        assert_eq!(snapshot.amount1, U256::from(29553010879137169u64));
    }

    #[test]
    fn test_unaligned_range_rejected() {
        let mut p = position(1);
        p.tick_lower = -610;
        let err = PositionSnapshot::capture(1, p, &pool_at_tick(0)).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange(_)));
    }

    #[test]
    fn test_pool_mismatch() {
        let mut p = position(1);
        p.fee = 500;
        let err = p.validate_against(&pool_at_tick(0)).unwrap_err();
        assert!(matches!(err, CoreError::PoolMismatch(_)));
    }

    #[test]
    fn test_in_range() {
        let p = position(1);
        assert!(p.in_range(-600));
        assert!(p.in_range(599));
        assert!(!p.in_range(600));
    }
}
