// src/models.rs
// Core types shared by the fetcher and the explorer

use serde::Serialize;

/// Number of token slots persisted per user
pub const MAX_TOKEN_SLOTS: usize = 10;

/// Token detail page for a contract on Base
pub const DEXSCREENER_BASE_URL: &str = "https://dexscreener.com/base";

/// One row of the source user list
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub fid: i64,
    pub fname: String,
    /// Raw pipe-delimited candidate wallet addresses, unvalidated
    pub addresses: String,
    pub followers: i64,
    /// Profile URL pulled out of the `fname_link` anchor, if any
    pub profile_url: Option<String>,
}

/// A single token balance as returned by the balance lookup service
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub symbol: String,
    pub token_address: String,
    /// Missing when the service has no price for the token
    pub usd_value: Option<f64>,
}

impl TokenBalance {
    pub fn new(symbol: &str, token_address: &str, usd_value: Option<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            token_address: token_address.to_string(),
            usd_value,
        }
    }
}

/// Aggregated holding of one token for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenHolding {
    pub symbol: String,
    pub address: String,
    pub usd_value: f64,
}

impl TokenHolding {
    pub fn new(symbol: &str, address: &str, usd_value: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            address: address.to_string(),
            usd_value,
        }
    }

    /// Dexscreener link for this token's contract
    pub fn dexscreener_url(&self) -> Option<String> {
        token_link(&self.address)
    }
}

/// Build the dexscreener link for a contract address; None when the address is blank
pub fn token_link(address: &str) -> Option<String> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    Some(format!("{}/{}", DEXSCREENER_BASE_URL, address))
}

/// A user's top holdings, highest value first, never more than `MAX_TOKEN_SLOTS`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TopTokens(Vec<TokenHolding>);

impl TopTokens {
    /// Wrap holdings that are already ranked; anything past the slot limit is dropped
    pub fn from_ranked(mut holdings: Vec<TokenHolding>) -> Self {
        holdings.truncate(MAX_TOKEN_SLOTS);
        Self(holdings)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenHolding> {
        self.0.iter()
    }

    /// Holding stored in 1-based slot `slot`, or None if the slot is absent
    pub fn slot(&self, slot: usize) -> Option<&TokenHolding> {
        slot.checked_sub(1).and_then(|idx| self.0.get(idx))
    }

    /// Symbols in slot order (may repeat when two contracts share a symbol)
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|h| h.symbol.as_str())
    }

    pub fn total_value(&self) -> f64 {
        self.0.iter().map(|h| h.usd_value).sum()
    }
}

impl<'a> IntoIterator for &'a TopTokens {
    type Item = &'a TokenHolding;
    type IntoIter = std::slice::Iter<'a, TokenHolding>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One line of the aggregated balances CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRow {
    pub fid: i64,
    pub fname: String,
    pub tokens: TopTokens,
}

/// Holder count and summed value for one symbol across all users
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularityEntry {
    pub symbol: String,
    pub holders: usize,
    pub total_value: f64,
}
