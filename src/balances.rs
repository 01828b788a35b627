/// Token balance lookup for wallet addresses
///
/// The aggregation code only sees the [`BalanceLookup`] trait. [`MoralisClient`]
/// is the production implementation backed by the Moralis wallet API; tests
/// plug in in-memory lookups.
///
/// # Example
///
/// ```no_run
/// use fc_token_insights::balances::{BalanceLookup, MoralisClient, MoralisConfig};
///
/// let client = MoralisClient::new(MoralisConfig {
///     api_key: "your_api_key".to_string(),
///     ..MoralisConfig::default()
/// })?;
///
/// for balance in client.token_balances("0x4ed4e862860bed51a9570b96d89af5e1b0efefed")? {
///     println!("{}: {:?}", balance.symbol, balance.usd_value);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::TokenBalance;

pub const MORALIS_API_BASE: &str = "https://deep-index.moralis.io/api/v2.2";
pub const DEFAULT_CHAIN: &str = "base";

/// Failure of a single balance lookup. Never fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("balance API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode balance response: {0}")]
    Decode(String),
}

/// Anything that can list token balances for a wallet address
pub trait BalanceLookup {
    fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, FetchError>;
}

impl<T: BalanceLookup + ?Sized> BalanceLookup for &T {
    fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, FetchError> {
        (**self).token_balances(address)
    }
}

/// Connection settings for the Moralis wallet API
#[derive(Debug, Clone)]
pub struct MoralisConfig {
    pub api_key: String,
    pub api_base: String,
    pub chain: String,
    pub timeout: Duration,
}

impl Default for MoralisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: MORALIS_API_BASE.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Response envelope of `GET /wallets/{address}/tokens`
#[derive(Debug, Deserialize)]
struct WalletTokensResponse {
    #[serde(default)]
    result: Vec<WalletToken>,
}

#[derive(Debug, Deserialize)]
struct WalletToken {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    token_address: Option<String>,
    #[serde(default)]
    usd_value: Option<f64>,
}

impl From<WalletToken> for TokenBalance {
    fn from(token: WalletToken) -> Self {
        Self {
            symbol: token.symbol.unwrap_or_default(),
            token_address: token.token_address.unwrap_or_default(),
            usd_value: token.usd_value,
        }
    }
}

/// Blocking Moralis client for a single chain
#[derive(Debug)]
pub struct MoralisClient {
    config: MoralisConfig,
    http_client: Client,
}

impl MoralisClient {
    pub fn new(config: MoralisConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, http_client })
    }

    pub fn chain(&self) -> &str {
        &self.config.chain
    }

    fn tokens_url(&self, address: &str) -> String {
        format!(
            "{}/wallets/{}/tokens?chain={}",
            self.config.api_base.trim_end_matches('/'),
            address,
            self.config.chain
        )
    }
}

impl BalanceLookup for MoralisClient {
    fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, FetchError> {
        let url = self.tokens_url(address);
        debug!(%address, chain = %self.config.chain, "requesting token balances");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-API-Key", &self.config.api_key)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        let balances = parse_wallet_tokens(&body)?;
        debug!(%address, count = balances.len(), "received token balances");
        Ok(balances)
    }
}

/// Decode a wallet-tokens response body
fn parse_wallet_tokens(body: &str) -> Result<Vec<TokenBalance>, FetchError> {
    let parsed: WalletTokensResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(parsed.result.into_iter().map(TokenBalance::from).collect())
}
