// src/services/llama.rs
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LandscapeError;

const TVL_BASE_URL: &str = "https://api.llama.fi";
const YIELDS_BASE_URL: &str = "https://yields.llama.fi";

// Bounded per-call timeout; the APIs are unauthenticated and occasionally slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client over the two DeFiLlama surfaces: the aggregate TVL
/// service and the yields service. One request per identifier per run, no
/// retries.
pub struct LlamaClient {
    client: Client,
    tvl_base: String,
    yields_base: String,
}

/// `/protocol/{slug}`, reduced to the keys the pipeline consumes.
#[derive(Debug, Deserialize)]
pub struct ProtocolResponse {
    pub name: String,
    #[serde(rename = "currentChainTvls", default)]
    pub current_chain_tvls: HashMap<String, f64>,
    #[serde(rename = "chainTvls", default)]
    pub chain_tvls: HashMap<String, ChainHistory>,
}

#[derive(Debug, Deserialize)]
pub struct ChainHistory {
    #[serde(default)]
    pub tvl: Vec<ChainTvlEntry>,
}

/// One dated balance for one chain. The API serves `totalLiquidityUSD` as a
/// number for most protocols and as a decimal string for some older ones.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChainTvlEntry {
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD", deserialize_with = "f64_or_string")]
    pub total_liquidity_usd: f64,
}

/// `/protocols` listing entry, for the protocol metadata tab.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolListing {
    pub name: String,
    pub slug: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    pub tvl: Option<f64>,
}

/// `/pools` listing entry, for the pool yields tab.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolListing {
    pub chain: String,
    pub project: String,
    pub symbol: String,
    pub tvl_usd: f64,
    pub apy: Option<f64>,
    pub apy_base: Option<f64>,
    pub apy_reward: Option<f64>,
    pub pool: String,
}

/// `/chart/{pool}` raw point. The endpoint also serves the derived `il7d`
/// and `apyBase7d` fields; those intentionally have no counterpart here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: String,
    pub tvl_usd: f64,
    pub apy: Option<f64>,
    pub apy_base: Option<f64>,
    pub apy_reward: Option<f64>,
}

/// `/v2/historicalChainTvl/{chain}` point.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChainTvlPoint {
    pub date: i64,
    pub tvl: f64,
}

/// The yields service wraps its payloads in `{status, data}`.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

impl LlamaClient {
    pub fn new() -> Self {
        Self::with_base_urls(TVL_BASE_URL, YIELDS_BASE_URL)
    }

    pub fn with_base_urls(tvl_base: &str, yields_base: &str) -> Self {
        LlamaClient {
            client: Client::new(),
            tvl_base: tvl_base.trim_end_matches('/').to_string(),
            yields_base: yields_base.trim_end_matches('/').to_string(),
        }
    }

    /// Current aggregate TVL in USD; the endpoint returns a bare number.
    pub async fn current_tvl(&self, slug: &str) -> Result<f64, LandscapeError> {
        self.get_json(format!("{}/tvl/{}", self.tvl_base, slug)).await
    }

    /// Full historical breakdown by chain and token for one protocol.
    pub async fn protocol(&self, slug: &str) -> Result<ProtocolResponse, LandscapeError> {
        self.get_json(format!("{}/protocol/{}", self.tvl_base, slug)).await
    }

    /// The whole protocol universe with current metadata.
    pub async fn protocols(&self) -> Result<Vec<ProtocolListing>, LandscapeError> {
        self.get_json(format!("{}/protocols", self.tvl_base)).await
    }

    /// Daily TVL history for an entire chain.
    pub async fn chain_tvl_history(&self, chain: &str) -> Result<Vec<ChainTvlPoint>, LandscapeError> {
        self.get_json(format!("{}/v2/historicalChainTvl/{}", self.tvl_base, chain))
            .await
    }

    /// The whole pool universe with current yields.
    pub async fn pools(&self) -> Result<Vec<PoolListing>, LandscapeError> {
        let envelope: DataEnvelope<PoolListing> =
            self.get_json(format!("{}/pools", self.yields_base)).await?;
        Ok(envelope.data)
    }

    /// Full TVL/APY chart for one pool.
    pub async fn pool_chart(&self, pool_id: &str) -> Result<Vec<ChartPoint>, LandscapeError> {
        let envelope: DataEnvelope<ChartPoint> = self
            .get_json(format!("{}/chart/{}", self.yields_base, pool_id))
            .await?;
        Ok(envelope.data)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, LandscapeError> {
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LandscapeError::UpstreamUnavailable {
                url: url.clone(),
                source: e,
            })?;

        response
            .json::<T>()
            .await
            .map_err(|e| LandscapeError::MalformedResponse(format!("{}: {}", url, e)))
    }
}

impl Default for LlamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_response_decodes_string_and_numeric_balances() {
        let raw = r#"{
            "name": "Curve DEX",
            "currentChainTvls": {"Ethereum": 100.0, "Ethereum-borrowed": 40.0},
            "chainTvls": {
                "Ethereum": {"tvl": [{"date": 1700000000, "totalLiquidityUSD": "50"}]},
                "Polygon": {"tvl": [{"date": 1700000000, "totalLiquidityUSD": 30}]}
            }
        }"#;

        let response: ProtocolResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.name, "Curve DEX");
        assert_eq!(response.current_chain_tvls["Ethereum"], 100.0);

        let eth = &response.chain_tvls["Ethereum"].tvl[0];
        assert_eq!(eth.total_liquidity_usd, 50.0);
        let polygon = &response.chain_tvls["Polygon"].tvl[0];
        assert_eq!(polygon.total_liquidity_usd, 30.0);
    }

    #[test]
    fn non_numeric_balance_string_is_rejected() {
        let raw = r#"{"date": 1700000000, "totalLiquidityUSD": "not a number"}"#;
        assert!(serde_json::from_str::<ChainTvlEntry>(raw).is_err());
    }

    #[test]
    fn chart_envelope_decodes_and_ignores_derived_fields() {
        let raw = r#"{
            "status": "success",
            "data": [{
                "timestamp": "2024-01-01T00:00:00.000Z",
                "tvlUsd": 100.0,
                "apy": 5.5,
                "apyBase": 4.0,
                "apyReward": 1.5,
                "il7d": null,
                "apyBase7d": 3.9
            }]
        }"#;

        let envelope: DataEnvelope<ChartPoint> = serde_json::from_str(raw).unwrap();
        let point = &envelope.data[0];
        assert_eq!(point.timestamp, "2024-01-01T00:00:00.000Z");
        assert_eq!(point.tvl_usd, 100.0);
        assert_eq!(point.apy, Some(5.5));
    }
}
