use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{hex, Address};
use chrono::DateTime;
use log::debug;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{CoreError, Result},
    indexer::cache::{Clock, SystemClock, TtlCache},
    models::VolumeSample,
    rpc::bounded,
    utils::{calculate_7day_average_apr, fee_tier_fraction, APR_WINDOW_DAYS},
};

const POOL_DAY_DATAS_QUERY: &str = r#"
query PoolDayDatas($pool: String!, $days: Int!) {
  poolDayDatas(first: $days, orderBy: date, orderDirection: desc, where: { pool: $pool }) {
    date
    volumeUSD
  }
}"#;

const POOL_QUERY: &str = r#"
query Pool($pool: ID!) {
  pool(id: $pool) {
    feeTier
    totalValueLockedUSD
  }
}"#;

/// Fee tier and TVL for one pool as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolMetrics {
    pub fee_tier: u32,
    pub tvl_usd: f64,
}

#[derive(Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolDayDatas {
    pool_day_datas: Vec<RawDayData>,
}

#[derive(Deserialize)]
struct RawDayData {
    date: i64,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
}

#[derive(Deserialize)]
struct PoolData {
    pool: Option<RawPool>,
}

#[derive(Deserialize)]
struct RawPool {
    #[serde(rename = "feeTier")]
    fee_tier: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
}

/// Subgraph client for historical volume and TVL.
///
/// Responses are cached per pool for the configured TTL.
pub struct IndexerClient<C: Clock = SystemClock> {
    http: Client,
    url: String,
    timeout: Duration,
    volumes: TtlCache<Address, Vec<VolumeSample>, Arc<C>>,
    metrics: TtlCache<Address, Option<PoolMetrics>, Arc<C>>,
}

impl IndexerClient<SystemClock> {
    pub fn new(url: &str, timeout: Duration, cache_ttl: Duration) -> Result<Self> {
        Self::with_clock(url, timeout, cache_ttl, SystemClock)
    }
}

impl<C: Clock> IndexerClient<C> {
    pub fn with_clock(url: &str, timeout: Duration, cache_ttl: Duration, clock: C) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Indexer(format!("failed to build HTTP client: {e}")))?;

        let ttl = chrono::Duration::from_std(cache_ttl)
            .map_err(|e| CoreError::Indexer(format!("invalid cache ttl: {e}")))?;
        let clock = Arc::new(clock);

        Ok(Self {
            http,
            url: url.to_string(),
            timeout,
            volumes: TtlCache::new(ttl, clock.clone()),
            metrics: TtlCache::new(ttl, clock),
        })
    }

    /// Most recent daily volume samples, newest first.
    pub async fn volume_samples(
        &self,
        pool: Address,
        cancel: &CancellationToken,
    ) -> Result<Vec<VolumeSample>> {
        if let Some(samples) = self.volumes.get(&pool) {
            return Ok(samples);
        }

        let body = self
            .query(
                POOL_DAY_DATAS_QUERY,
                json!({ "pool": pool_id(pool), "days": APR_WINDOW_DAYS }),
                cancel,
            )
            .await?;
        let samples = parse_volume_samples(&body)?;

        debug!("Indexer returned {} volume samples for {}", samples.len(), pool);
        self.volumes.insert(pool, samples.clone());
        Ok(samples)
    }

    /// Fee tier and TVL, or `None` when the indexer does not know the pool.
    pub async fn pool_metrics(
        &self,
        pool: Address,
        cancel: &CancellationToken,
    ) -> Result<Option<PoolMetrics>> {
        if let Some(metrics) = self.metrics.get(&pool) {
            return Ok(metrics);
        }

        let body = self
            .query(POOL_QUERY, json!({ "pool": pool_id(pool) }), cancel)
            .await?;
        let metrics = parse_pool_metrics(&body)?;

        self.metrics.insert(pool, metrics);
        Ok(metrics)
    }

    /// Trailing 7-day fee APR in percent.
    ///
    /// A pool with no volume history, or one the indexer has not indexed,
    /// yields 0. Transport failures, timeouts and cancellation are errors.
    pub async fn seven_day_apr(&self, pool: Address, cancel: &CancellationToken) -> Result<f64> {
        let samples = self.volume_samples(pool, cancel).await?;
        if samples.is_empty() {
            debug!("No volume history for {}, APR is 0", pool);
            return Ok(0.0);
        }

        let Some(metrics) = self.pool_metrics(pool, cancel).await? else {
            debug!("Pool {} not indexed, APR is 0", pool);
            return Ok(0.0);
        };

        Ok(calculate_7day_average_apr(
            &samples,
            fee_tier_fraction(metrics.fee_tier),
            metrics.tvl_usd,
        ))
    }

    async fn query(
        &self,
        query: &str,
        variables: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let payload = json!({ "query": query, "variables": variables });

        let request = async {
            let response = self
                .http
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| CoreError::Indexer(format!("request failed: {e}")))?
                .error_for_status()
                .map_err(|e| CoreError::Indexer(format!("bad status: {e}")))?;

            response
                .text()
                .await
                .map_err(|e| CoreError::Indexer(format!("failed to read body: {e}")))
        };

        bounded("indexer query", self.timeout, cancel, request).await?
    }
}

/// Subgraph entity id for a pool: lowercase 0x-prefixed hex.
pub fn pool_id(pool: Address) -> String {
    format!("0x{}", hex::encode(pool))
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let response: GraphResponse<T> = serde_json::from_str(body)
        .map_err(|e| CoreError::Indexer(format!("malformed response: {e}")))?;

    if let Some(first) = response.errors.first() {
        return Err(CoreError::Indexer(format!(
            "query failed: {} ({} errors)",
            first.message,
            response.errors.len()
        )));
    }
    response
        .data
        .ok_or_else(|| CoreError::Indexer("response has no data".to_string()))
}

pub fn parse_volume_samples(body: &str) -> Result<Vec<VolumeSample>> {
    let data: PoolDayDatas = parse_response(body)?;

    data.pool_day_datas
        .into_iter()
        .map(|raw| {
            let date = DateTime::from_timestamp(raw.date, 0)
                .ok_or_else(|| CoreError::Indexer(format!("invalid day timestamp {}", raw.date)))?
                .date_naive();
            let volume_usd = raw
                .volume_usd
                .parse::<f64>()
                .map_err(|e| CoreError::Indexer(format!("invalid volumeUSD {}: {e}", raw.volume_usd)))?;
            Ok(VolumeSample::new(date, volume_usd))
        })
        .collect()
}

/// `Ok(None)` when the response has no entity for the pool.
pub fn parse_pool_metrics(body: &str) -> Result<Option<PoolMetrics>> {
    let data: PoolData = parse_response(body)?;
    let Some(pool) = data.pool else {
        return Ok(None);
    };

    let fee_tier = pool
        .fee_tier
        .parse::<u32>()
        .map_err(|e| CoreError::Indexer(format!("invalid feeTier {}: {e}", pool.fee_tier)))?;
    let tvl_usd = pool.total_value_locked_usd.parse::<f64>().map_err(|e| {
        CoreError::Indexer(format!(
            "invalid totalValueLockedUSD {}: {e}",
            pool.total_value_locked_usd
        ))
    })?;

    Ok(Some(PoolMetrics { fee_tier, tvl_usd }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_volume_samples() {
        let body = r#"{"data":{"poolDayDatas":[
            {"date":1704153600,"volumeUSD":"150000.5"},
            {"date":1704067200,"volumeUSD":"98000"}
        ]}}"#;
        let samples = parse_volume_samples(body).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(samples[0].volume_usd, 150000.5);
        assert_eq!(samples[1].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_empty_history() {
        let samples = parse_volume_samples(r#"{"data":{"poolDayDatas":[]}}"#).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_parse_pool_metrics() {
        let body = r#"{"data":{"pool":{"feeTier":"3000","totalValueLockedUSD":"100000.25"}}}"#;
        assert_eq!(
            parse_pool_metrics(body).unwrap(),
            Some(PoolMetrics {
                fee_tier: 3000,
                tvl_usd: 100000.25
            })
        );
    }

    #[test]
    fn test_graphql_errors_surface() {
        let body = r#"{"data":null,"errors":[{"message":"indexing_error"}]}"#;
        let err = parse_pool_metrics(body).unwrap_err();
        assert!(matches!(err, CoreError::Indexer(msg) if msg.contains("indexing_error")));
    }

    #[test]
    fn test_unknown_pool() {
        assert_eq!(parse_pool_metrics(r#"{"data":{"pool":null}}"#).unwrap(), None);
    }

    #[test]
    fn test_pool_id_is_lowercase() {
        let pool = address!("8AD599C3A0FF1DE082011EFDDC58F1908EB6E6D8");
        assert_eq!(pool_id(pool), "0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8");
    }

    fn unreachable_client() -> IndexerClient {
        IndexerClient::new(
            "http://127.0.0.1:9/subgraph",
            Duration::from_secs(2),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_indexer_surfaces_network_error() {
        let err = unreachable_client()
            .seven_day_apr(Address::ZERO, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_network(), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn test_cancelled_apr_is_not_zero() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = unreachable_client()
            .seven_day_apr(Address::ZERO, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled(_)));
    }
}
