use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use anyhow::Context;
use jemallocator::Jemalloc;
use log::{debug, error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use concentra::{
    models::{PoolState, PositionSnapshot},
    utils::SlippageTolerance,
    AlloyRpcClient, BatchReader, CoreError, IndexerClient, PoolReader, Settings,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    let settings = Arc::new(
        Settings::new().context("Failed to load config. Please ensure it exists and is valid")?,
    );

    let cancellation_token = CancellationToken::new();

    let watcher = Watcher::new(&settings).context("Failed to initialize watcher")?;

    let watcher_token = cancellation_token.child_token();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(watcher_token).await {
            error!("Watcher failed: {:#}", e);
        }
    });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Watching {} pools. Press Ctrl+C to stop.", settings.watch.pools.len());

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    info!("Waiting for watcher to stop...");
    let _ = watcher_handle.await;

    info!("Stopped");
    Ok(())
}

struct Watcher {
    settings: Arc<Settings>,
    pools: PoolReader<AlloyRpcClient>,
    indexer: Option<IndexerClient>,
    tolerance: SlippageTolerance,
}

impl Watcher {
    fn new(settings: &Arc<Settings>) -> anyhow::Result<Self> {
        let rpc = Arc::new(
            AlloyRpcClient::new(&settings.rpc.url).context("Failed to create RPC client")?,
        );

        let batch = BatchReader::new(rpc, settings.rpc.multicall()?, settings.rpc.timeout())
            .with_max_batch_size(settings.rpc.max_batch_size)
            .with_retry(
                settings.rpc.max_retries,
                Duration::from_millis(settings.rpc.retry_delay_ms),
            );
        let pools = PoolReader::new(batch, settings.position.position_manager()?);

        let indexer = match &settings.indexer {
            Some(indexer) => Some(
                IndexerClient::new(
                    &indexer.subgraph_url,
                    Duration::from_millis(indexer.timeout_ms),
                    Duration::from_secs(indexer.cache_ttl_secs),
                )
                .context("Failed to create indexer client")?,
            ),
            None => {
                warn!("No indexer configured, APR estimates disabled");
                None
            }
        };

        let tolerance = SlippageTolerance::from_percent(settings.position.slippage_percent)
            .context("Invalid position.slippage_percent")?;

        Ok(Self {
            settings: settings.clone(),
            pools,
            indexer,
            tolerance,
        })
    }

    async fn run(&self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.settings.watch.interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Watcher cancelled");
                    return Ok(());
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick(&cancellation_token).await {
                        if cancellation_token.is_cancelled() {
                            return Ok(());
                        }
                        warn!("Watch cycle failed: {:#}", e);
                    }
                }
            }
        }
    }

    async fn tick(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        let addresses = self.settings.watch.pool_addresses()?;
        let states = self
            .pools
            .pool_states(&addresses, cancel)
            .await
            .context("Failed to read pool states")?;

        let mut live: Vec<PoolState> = Vec::with_capacity(states.len());
        for (address, state) in addresses.iter().zip(states) {
            match state {
                Ok(pool) => live.push(pool),
                Err(e) => warn!("Pool {} unreadable: {}", address, e),
            }
        }

        for pool in &live {
            self.report_pool(pool, cancel).await?;
        }

        if !self.settings.watch.positions.is_empty() {
            self.report_positions(&live, cancel).await?;
        }
        Ok(())
    }

    async fn report_pool(&self, pool: &PoolState, cancel: &CancellationToken) -> anyhow::Result<()> {
        let tokens = self
            .pools
            .token_infos(&[pool.token0, pool.token1], cancel)
            .await?;

        let price = match (&tokens[0], &tokens[1]) {
            (Ok(t0), Ok(t1)) => pool.human_price(t0.decimals, t1.decimals).ok(),
            _ => None,
        };

        let apr = match &self.indexer {
            Some(indexer) => match indexer.seven_day_apr(pool.address, cancel).await {
                Ok(apr) => Some(apr),
                Err(e @ CoreError::Cancelled(_)) => return Err(e.into()),
                Err(e) => {
                    warn!("APR for {} unavailable: {}", pool.address, e);
                    None
                }
            },
            None => None,
        };

        info!(
            "Pool {} tick={} liquidity={} price={} apr={}",
            pool.address,
            pool.tick,
            pool.liquidity,
            price.map_or("n/a".to_string(), |p| format!("{p:.6}")),
            apr.map_or("n/a".to_string(), |a| format!("{a:.2}%")),
        );
        Ok(())
    }

    async fn report_positions(
        &self,
        live: &[PoolState],
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let ids: Vec<U256> = self
            .settings
            .watch
            .positions
            .iter()
            .map(|id| U256::from(*id))
            .collect();
        let positions = self.pools.positions(&ids, cancel).await?;

        for (id, position) in ids.iter().zip(positions) {
            let position = match position {
                Ok(p) => p,
                Err(e) => {
                    warn!("Position {} unreadable: {}", id, e);
                    continue;
                }
            };

            let Some(pool) = live.iter().find(|p| position.validate_against(p).is_ok()) else {
                debug!("Position {} is not in a watched pool", id);
                continue;
            };

            let snapshot = PositionSnapshot::capture(self.settings.rpc.chain_id, position, pool)?;
            info!(
                "Position {} [{}, {}] in_range={} amount0={} (min {}) amount1={} (min {}) owed=({}, {})",
                id,
                snapshot.position.tick_lower,
                snapshot.position.tick_upper,
                snapshot.position.in_range(pool.tick),
                snapshot.amount0,
                self.tolerance.min_amount(snapshot.amount0)?,
                snapshot.amount1,
                self.tolerance.min_amount(snapshot.amount1)?,
                snapshot.position.tokens_owed0,
                snapshot.position.tokens_owed1,
            );
        }
        Ok(())
    }
}
