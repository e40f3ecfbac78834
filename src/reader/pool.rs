use alloy::primitives::{Address, U256};
use log::{debug, info};
use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::{
    abis::{INonfungiblePositionManager, IUniswapV3Pool, IERC20},
    error::{CoreError, Result},
    models::{PoolState, Position, TokenInfo},
    reader::batch::{BatchCall, BatchReader, BatchResult},
    rpc::RpcClient,
    utils::MAX_TOKEN_DECIMALS,
};

/// Number of multicall slots read per pool.
const POOL_FIELDS: usize = 6;

/// Token decimals cache capacity.
const TOKEN_CACHE_CAPACITY: u64 = 10_000;

/// One decoded pool slot.
#[derive(Debug, Clone, PartialEq)]
enum PoolField {
    Slot0 { sqrt_price_x96: U256, tick: i32 },
    Liquidity(u128),
    Token0(Address),
    Token1(Address),
    Fee(u32),
    TickSpacing(i32),
}

/// Reads pool, position and token state through a [`BatchReader`].
///
/// Pools take six slots each, positions and tokens one; a list of N pools is
/// still a single round trip. Token decimals never change, so they are kept in
/// a bounded cache.
pub struct PoolReader<R> {
    batch: BatchReader<R>,
    position_manager: Address,
    tokens: Cache<Address, TokenInfo>,
}

impl<R: RpcClient> PoolReader<R> {
    pub fn new(batch: BatchReader<R>, position_manager: Address) -> Self {
        let tokens = Cache::builder().max_capacity(TOKEN_CACHE_CAPACITY).build();

        Self {
            batch,
            position_manager,
            tokens,
        }
    }

    pub fn batch(&self) -> &BatchReader<R> {
        &self.batch
    }

    /// Read current state for every pool; a pool with any failed slot is an
    /// error at its own index. Large lists are split by the batch reader's
    /// `max_batch_size`.
    pub async fn pool_states(
        &self,
        pools: &[Address],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<PoolState>> {
        let calls: Vec<BatchCall<PoolField>> = pools.iter().flat_map(|p| pool_calls(*p)).collect();

        let mut slots = self.batch.read_with_retry(&calls, cancel).await?.into_iter();

        let states: BatchResult<PoolState> = pools
            .iter()
            .enumerate()
            .map(|(index, address)| {
                let fields: Vec<Result<PoolField>> = slots.by_ref().take(POOL_FIELDS).collect();
                assemble_pool(*address, fields).map_err(|e| reindex(e, index))
            })
            .collect();

        debug!(
            "Read {} pools ({} ok)",
            pools.len(),
            states.iter().filter(|s| s.is_ok()).count()
        );
        Ok(states)
    }

    /// Read positions by NFT id from the position manager.
    pub async fn positions(
        &self,
        token_ids: &[U256],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<Position>> {
        let calls: Vec<BatchCall<Position>> = token_ids
            .iter()
            .map(|token_id| {
                let token_id = *token_id;
                BatchCall::new(
                    self.position_manager,
                    INonfungiblePositionManager::positionsCall { tokenId: token_id },
                    move |p| Position {
                        token_id,
                        token0: p.token0,
                        token1: p.token1,
                        fee: p.fee.to::<u32>(),
                        tick_lower: p.tickLower.as_i32(),
                        tick_upper: p.tickUpper.as_i32(),
                        liquidity: p.liquidity,
                        fee_growth_inside0_last_x128: p.feeGrowthInside0LastX128,
                        fee_growth_inside1_last_x128: p.feeGrowthInside1LastX128,
                        tokens_owed0: p.tokensOwed0,
                        tokens_owed1: p.tokensOwed1,
                    },
                )
            })
            .collect();

        self.batch.read_with_retry(&calls, cancel).await
    }

    /// Token decimals, served from cache when known. Missing tokens are
    /// fetched in one batch; tokens that fail stay uncached.
    pub async fn token_infos(
        &self,
        addresses: &[Address],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<TokenInfo>> {
        let mut cached = Vec::with_capacity(addresses.len());
        for address in addresses {
            cached.push(self.tokens.get(address).await);
        }

        let missing: Vec<Address> = addresses
            .iter()
            .zip(cached.iter())
            .filter(|(_, hit)| hit.is_none())
            .map(|(address, _)| *address)
            .collect();

        let calls: Vec<BatchCall<TokenInfo>> = missing
            .iter()
            .map(|address| {
                let address = *address;
                BatchCall::try_new(address, IERC20::decimalsCall {}, move |decimals| {
                    if decimals > MAX_TOKEN_DECIMALS {
                        return Err(format!("token {address} reports {decimals} decimals"));
                    }
                    Ok(TokenInfo::new(address, decimals))
                })
            })
            .collect();

        let mut fetched = self.batch.read_with_retry(&calls, cancel).await?.into_iter();

        let mut results = Vec::with_capacity(addresses.len());
        for hit in cached {
            match hit {
                Some(info) => results.push(Ok(info)),
                None => {
                    let index = results.len();
                    let slot = fetched
                        .next()
                        .unwrap_or_else(|| {
                            Err(CoreError::Decode {
                                index,
                                reason: "missing token slot".to_string(),
                            })
                        })
                        .map_err(|e| reindex(e, index));
                    if let Ok(info) = &slot {
                        self.tokens.insert(info.address, *info).await;
                    }
                    results.push(slot);
                }
            }
        }

        if !missing.is_empty() {
            info!("Fetched metadata for {} tokens", missing.len());
        }
        Ok(results)
    }
}

/// Point a slot error at the caller's position instead of the multicall slot.
fn reindex(error: CoreError, index: usize) -> CoreError {
    match error {
        CoreError::Decode { reason, .. } => CoreError::Decode { index, reason },
        other => other,
    }
}

fn pool_calls(pool: Address) -> [BatchCall<PoolField>; POOL_FIELDS] {
    [
        BatchCall::new(pool, IUniswapV3Pool::slot0Call {}, |s| PoolField::Slot0 {
            sqrt_price_x96: U256::from(s.sqrtPriceX96),
            tick: s.tick.as_i32(),
        }),
        BatchCall::new(pool, IUniswapV3Pool::liquidityCall {}, PoolField::Liquidity),
        BatchCall::new(pool, IUniswapV3Pool::token0Call {}, PoolField::Token0),
        BatchCall::new(pool, IUniswapV3Pool::token1Call {}, PoolField::Token1),
        BatchCall::new(pool, IUniswapV3Pool::feeCall {}, |fee| {
            PoolField::Fee(fee.to::<u32>())
        }),
        BatchCall::new(pool, IUniswapV3Pool::tickSpacingCall {}, |spacing| {
            PoolField::TickSpacing(spacing.as_i32())
        }),
    ]
}

fn assemble_pool(address: Address, fields: Vec<Result<PoolField>>) -> Result<PoolState> {
    let mut slot0 = None;
    let mut liquidity = None;
    let mut token0 = None;
    let mut token1 = None;
    let mut fee = None;
    let mut tick_spacing = None;

    for field in fields {
        match field? {
            PoolField::Slot0 {
                sqrt_price_x96,
                tick,
            } => slot0 = Some((sqrt_price_x96, tick)),
            PoolField::Liquidity(v) => liquidity = Some(v),
            PoolField::Token0(v) => token0 = Some(v),
            PoolField::Token1(v) => token1 = Some(v),
            PoolField::Fee(v) => fee = Some(v),
            PoolField::TickSpacing(v) => tick_spacing = Some(v),
        }
    }

    let missing = |name: &str| CoreError::InvalidPoolState(format!("pool {address}: {name} missing"));

    let (sqrt_price_x96, tick) = slot0.ok_or_else(|| missing("slot0"))?;

    PoolState::new(
        address,
        token0.ok_or_else(|| missing("token0"))?,
        token1.ok_or_else(|| missing("token1"))?,
        fee.ok_or_else(|| missing("fee"))?,
        tick_spacing.ok_or_else(|| missing("tickSpacing"))?,
        tick,
        sqrt_price_x96,
        liquidity.ok_or_else(|| missing("liquidity"))?,
    )
}
