use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};

use crate::{
    abis::{CollectParams, DecreaseLiquidityParams, INonfungiblePositionManager},
    error::{CoreError, Result},
    models::{PoolState, PositionSnapshot},
    rpc::SubmissionRequest,
    utils::SlippageTolerance,
};

/// A validated decrease-liquidity + collect submission for one position.
///
/// `liquidity == 0` means fee collection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    pub chain_id: u64,
    pub position_manager: Address,
    pub token_id: U256,
    pub percent: u8,
    pub liquidity: u128,
    pub expected_amount0: U256,
    pub expected_amount1: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
    pub deadline: u64,
}

impl RemovalRequest {
    /// `multicall([decreaseLiquidity, collect])` against the position manager.
    /// Collect maxima are `u128::MAX` so accrued fees leave in the same call.
    pub fn call_data(&self) -> Bytes {
        let mut data: Vec<Bytes> = Vec::with_capacity(2);

        if self.liquidity > 0 {
            let decrease = INonfungiblePositionManager::decreaseLiquidityCall {
                params: DecreaseLiquidityParams {
                    tokenId: self.token_id,
                    liquidity: self.liquidity,
                    amount0Min: self.amount0_min,
                    amount1Min: self.amount1_min,
                    deadline: U256::from(self.deadline),
                },
            };
            data.push(decrease.abi_encode().into());
        }

        let collect = INonfungiblePositionManager::collectCall {
            params: CollectParams {
                tokenId: self.token_id,
                recipient: self.recipient,
                amount0Max: u128::MAX,
                amount1Max: u128::MAX,
            },
        };
        data.push(collect.abi_encode().into());

        INonfungiblePositionManager::multicallCall { data }
            .abi_encode()
            .into()
    }

    pub fn to_submission(&self, from: Address) -> SubmissionRequest {
        SubmissionRequest {
            chain_id: self.chain_id,
            from,
            to: self.position_manager,
            call_data: self.call_data(),
        }
    }
}

/// Builds removal and collect requests from a position snapshot and the
/// pool's current state.
#[derive(Debug, Clone)]
pub struct PositionOperationBuilder {
    snapshot: PositionSnapshot,
    pool: PoolState,
    position_manager: Address,
    recipient: Address,
    deadline: u64,
    tolerance: SlippageTolerance,
}

impl PositionOperationBuilder {
    /// Fails with `PoolMismatch` when `pool` is not the position's pool.
    pub fn new(
        snapshot: PositionSnapshot,
        pool: PoolState,
        position_manager: Address,
        recipient: Address,
        deadline: u64,
    ) -> Result<Self> {
        snapshot.position.validate_against(&pool)?;

        Ok(Self {
            snapshot,
            pool,
            position_manager,
            recipient,
            deadline,
            tolerance: SlippageTolerance::default(),
        })
    }

    pub fn with_tolerance(mut self, tolerance: SlippageTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.snapshot.chain_id
    }

    pub fn snapshot(&self) -> &PositionSnapshot {
        &self.snapshot
    }

    /// Remove `percent` of the position's liquidity and collect everything owed.
    ///
    /// Below 100% the amounts are recomputed for exactly the removed liquidity
    /// at the pool's current price; at 100% the snapshot amounts are used.
    pub fn build_removal(&self, percent: u8) -> Result<RemovalRequest> {
        if !(1..=100).contains(&percent) {
            return Err(CoreError::InvalidPercent(percent));
        }

        let position = &self.snapshot.position;
        let liquidity = (U256::from(position.liquidity) * U256::from(percent) / U256::from(100u8))
            .to::<u128>();
        if liquidity == 0 {
            return Err(CoreError::InvalidPosition(format!(
                "removing {percent}% of position {} leaves no liquidity to remove",
                position.token_id
            )));
        }

        let (amount0, amount1) = if percent == 100 {
            (self.snapshot.amount0, self.snapshot.amount1)
        } else {
            position.amounts_for(liquidity, self.pool.sqrt_price_x96)?
        };

        self.request(percent, liquidity, amount0, amount1)
    }

    /// Collect accrued fees without touching liquidity.
    pub fn build_collect(&self) -> Result<RemovalRequest> {
        let position = &self.snapshot.position;
        if position.tokens_owed0 == 0 && position.tokens_owed1 == 0 {
            return Err(CoreError::InvalidPosition(format!(
                "position {} has nothing to collect",
                position.token_id
            )));
        }

        self.request(
            0,
            0,
            U256::from(position.tokens_owed0),
            U256::from(position.tokens_owed1),
        )
    }

    fn request(
        &self,
        percent: u8,
        liquidity: u128,
        amount0: U256,
        amount1: U256,
    ) -> Result<RemovalRequest> {
        // Fee collection has no price exposure
        let (amount0_min, amount1_min) = if liquidity == 0 {
            (U256::ZERO, U256::ZERO)
        } else {
            (
                self.tolerance.min_amount(amount0)?,
                self.tolerance.min_amount(amount1)?,
            )
        };

        Ok(RemovalRequest {
            chain_id: self.snapshot.chain_id,
            position_manager: self.position_manager,
            token_id: self.snapshot.position.token_id,
            percent,
            liquidity,
            expected_amount0: amount0,
            expected_amount1: amount1,
            amount0_min,
            amount1_min,
            recipient: self.recipient,
            deadline: self.deadline,
        })
    }
}
