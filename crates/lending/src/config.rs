//! The lending protocol's public configuration document.
//!
//! Published per deployment at `{base}/config?deployment={env}`. It lists
//! supported assets and, per market, the reserve accounts for each asset.
//! Unknown fields are ignored so protocol-side additions do not break us.

use async_trait::async_trait;
use chain_sol::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::Environment;
use crate::error::LendingError;
use crate::retry::{with_retry, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingConfig {
    #[serde(rename = "programID")]
    pub program_id: Address,
    pub assets: Vec<AssetConfig>,
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub mint_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConfig {
    pub name: String,
    pub address: Address,
    pub authority_address: Address,
    #[serde(default)]
    pub is_primary: bool,
    pub reserves: Vec<ReserveConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveConfig {
    /// Asset symbol this reserve lends.
    pub asset: String,
    pub address: Address,
    pub collateral_mint_address: Address,
    pub collateral_supply_address: Address,
    pub liquidity_address: Address,
    pub liquidity_fee_receiver_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_supply_cap: Option<f64>,
}

/// Everything needed to address one asset's reserve in one market.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReserve {
    pub program_id: Address,
    pub market: Address,
    pub asset: AssetConfig,
    pub reserve: ReserveConfig,
}

impl LendingConfig {
    pub fn from_json(json: &str) -> Result<Self, LendingError> {
        serde_json::from_str(json)
            .map_err(|e| LendingError::Decode(format!("lending config: {e}")))
    }

    /// Look a market up by name (case-insensitive) or base58 address.
    /// `"main"` also matches the primary market.
    pub fn market(&self, pool: &str) -> Result<&MarketConfig, LendingError> {
        let pool = pool.trim();
        self.markets
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(pool) || m.address.to_string() == pool)
            .or_else(|| {
                pool.eq_ignore_ascii_case("main")
                    .then(|| self.primary_market())
                    .flatten()
            })
            .ok_or_else(|| LendingError::UnknownSymbol(format!("no lending market {pool:?}")))
    }

    pub fn primary_market(&self) -> Option<&MarketConfig> {
        self.markets
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| self.markets.first())
    }

    pub fn asset(&self, symbol: &str) -> Result<&AssetConfig, LendingError> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol.trim()))
            .ok_or_else(|| LendingError::UnknownSymbol(symbol.to_string()))
    }

    pub fn resolve_reserve(&self, pool: &str, symbol: &str) -> Result<ResolvedReserve, LendingError> {
        let market = self.market(pool)?;
        let asset = self.asset(symbol)?;
        let reserve = market
            .reserves
            .iter()
            .find(|r| r.asset.eq_ignore_ascii_case(&asset.symbol))
            .ok_or_else(|| {
                LendingError::UnknownSymbol(format!("{symbol} is not listed in market {}", market.name))
            })?;

        Ok(ResolvedReserve {
            program_id: self.program_id,
            market: market.address,
            asset: asset.clone(),
            reserve: reserve.clone(),
        })
    }

    /// Every reserve of a market joined with its asset.
    pub fn market_reserves(&self, pool: &str) -> Result<Vec<ResolvedReserve>, LendingError> {
        let market = self.market(pool)?;
        market
            .reserves
            .iter()
            .map(|r| self.resolve_reserve(&market.address.to_string(), &r.asset))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Config source collaborator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, environment: Environment) -> Result<LendingConfig, LendingError>;
}

/// Fetches the config document over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpConfigSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    async fn fetch_once(&self, environment: Environment) -> Result<LendingConfig, LendingError> {
        let url = format!("{}/config", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[("deployment", environment.as_str())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LendingError::Transport(format!("GET {url}: {e}")))?
            .text()
            .await
            .map_err(|e| LendingError::Transport(format!("GET {url}: {e}")))?;

        LendingConfig::from_json(&body)
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self, environment: Environment) -> Result<LendingConfig, LendingError> {
        let config = with_retry(&self.retry, "lending config", || self.fetch_once(environment)).await?;
        debug!(%environment, markets = config.markets.len(), "fetched lending config");
        Ok(config)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const MARKET: &str = "4UpD2fh7xH3VP9QQaXtsS1YY3bxzWhtfpks7FatyKvdY";
    pub const SOL_RESERVE: &str = "8PbodeaosQP19SjYFx855UMqWxH2HynZLdBXmsrbac36";
    pub const USDC_RESERVE: &str = "BgxfHJDzm44T7XG68MYKx7YisTjZu73tVovyZSjJMpmw";
    pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    pub fn config_json() -> serde_json::Value {
        serde_json::json!({
            "programID": "So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo",
            "assets": [
                {
                    "name": "Wrapped SOL",
                    "symbol": "SOL",
                    "decimals": 9,
                    "mintAddress": "So11111111111111111111111111111111111111112",
                    "logo": "https://example.invalid/sol.png"
                },
                {
                    "name": "USD Coin",
                    "symbol": "USDC",
                    "decimals": 6,
                    "mintAddress": USDC_MINT
                }
            ],
            "markets": [
                {
                    "name": "main",
                    "address": MARKET,
                    "authorityAddress": "DdZR6zRFiUt4S5mg7AV1uKB2z1f1WzcNYCaTEEWPAuby",
                    "isPrimary": true,
                    "reserves": [
                        {
                            "asset": "SOL",
                            "address": SOL_RESERVE,
                            "collateralMintAddress": "5h6ssFpeDeRbzsEHDbTQNH7nVGgsKrZydxdSTnLm6QdV",
                            "collateralSupplyAddress": "B1ATuYXNkacjjJS78MAmqu8Lu8PvEPt51u4oBasH1m1g",
                            "liquidityAddress": "8UviNr47S8eL6J3WfDxMRa3hvLta1VDJwNWqsDgtN3Cv",
                            "liquidityFeeReceiverAddress": "5wo1tFpi4HaVKnemqaXeQnBEpezrJXcXvuztYaPhvgC7",
                            "userSupplyCap": 1000000
                        },
                        {
                            "asset": "USDC",
                            "address": USDC_RESERVE,
                            "collateralMintAddress": "993dVFL2uXWYeoXuEBFXR4BijeXdTv4s6BzsCjJZuwqk",
                            "collateralSupplyAddress": "UtRy8gcEu9fCkDuUrU8EmC7Uc6FZy5NCwttzG7i6nkw",
                            "liquidityAddress": "8SheGtsopRUDzdiD6v6BR9a6bqZ9QwywYQY99Fp5meNf",
                            "liquidityFeeReceiverAddress": "5Gdxn4yquneifE6uk9tK8X4CqHfWKjW2BvYU25hAykwP"
                        }
                    ]
                }
            ],
            "oracles": { "pythProgramID": "FsJ3A3u2vn5cTVofAjvy6y5kwABJAqYWpe4975bi2epH" }
        })
    }

    pub fn config() -> LendingConfig {
        serde_json::from_value(config_json()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn parses_document_and_ignores_unknown_fields() {
        let config = config();
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.markets[0].reserves.len(), 2);
        assert_eq!(config.markets[0].reserves[0].user_supply_cap, Some(1_000_000.0));
        assert_eq!(config.markets[0].reserves[1].user_supply_cap, None);
    }

    #[test]
    fn resolve_by_market_name_or_address() {
        let config = config();
        let by_name = config.resolve_reserve("main", "usdc").unwrap();
        let by_address = config.resolve_reserve(MARKET, "USDC").unwrap();

        assert_eq!(by_name, by_address);
        assert_eq!(by_name.reserve.address.to_string(), USDC_RESERVE);
        assert_eq!(by_name.asset.decimals, 6);
        assert_eq!(by_name.program_id, crate::environment::PRODUCTION_PROGRAM_ID);
    }

    #[test]
    fn unknown_symbol() {
        let err = config().resolve_reserve("main", "DOGE").unwrap_err();
        assert_eq!(err, LendingError::UnknownSymbol("DOGE".into()));
    }

    #[test]
    fn unknown_market_is_reported_as_unknown_symbol() {
        let err = config().resolve_reserve("turbo", "SOL").unwrap_err();
        assert!(matches!(err, LendingError::UnknownSymbol(msg) if msg.contains("turbo")));
    }

    #[test]
    fn market_reserves_lists_all() {
        let reserves = config().market_reserves("main").unwrap();
        let symbols: Vec<&str> = reserves.iter().map(|r| r.asset.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "USDC"]);
    }

    #[test]
    fn malformed_document_is_a_decode_error() {
        assert!(matches!(
            LendingConfig::from_json("{\"assets\": 3}"),
            Err(LendingError::Decode(_))
        ));
    }
}
