/// Settings and configuration management
/// Handles environment variable loading and validation

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::balances::{DEFAULT_CHAIN, MORALIS_API_BASE, MoralisConfig};
use crate::fetcher::{DEFAULT_MIN_FOLLOWERS, FetchConfig};

// ============================================================================
// File Constants
// ============================================================================

pub const USERS_CSV: &str = "All_Active_Farcaster_Users.csv";
pub const BALANCES_CSV: &str = "aggregated_token_balances_v2.csv";

/// Rows logged as a preview after a fetch run
pub const PREVIEW_ROWS: usize = 5;

// ============================================================================
// Runtime Configuration (loaded from environment)
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    // Balance API
    pub api_key: String,
    pub api_base: String,
    pub chain: String,
    pub request_timeout_secs: u64,

    // Files
    pub users_csv: String,
    pub balances_csv: String,

    // Pipeline
    pub min_followers: i64,
    pub fetch_workers: usize,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if MORALIS_API_KEY is missing or still the placeholder.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("MORALIS_API_KEY")
            .context("MORALIS_API_KEY env var is required. Add it to your .env file.\n\
                     Get a key from https://admin.moralis.io/ (free tier available)")?;
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() || api_key == "YOUR_API_KEY" || api_key == "your_moralis_api_key_here" {
            anyhow::bail!(
                "MORALIS_API_KEY is set but has placeholder value.\n\
                Replace it with the key from your Moralis dashboard."
            );
        }

        Ok(Self {
            api_key,
            ..Self::without_api_key()
        })
    }

    /// Everything except the API key, for tools that never call the balance API
    pub fn without_api_key() -> Self {
        Self {
            api_key: String::new(),
            api_base: env::var("MORALIS_API_BASE").unwrap_or_else(|_| MORALIS_API_BASE.to_string()),
            chain: env::var("CHAIN").unwrap_or_else(|_| DEFAULT_CHAIN.to_string()),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            users_csv: env::var("USERS_CSV").unwrap_or_else(|_| USERS_CSV.to_string()),
            balances_csv: env::var("BALANCES_CSV").unwrap_or_else(|_| BALANCES_CSV.to_string()),
            min_followers: env_parse("MIN_FOLLOWERS", DEFAULT_MIN_FOLLOWERS),
            fetch_workers: env_parse("FETCH_WORKERS", 1usize).max(1),
        }
    }

    /// Connection settings for the balance client
    pub fn moralis_config(&self) -> MoralisConfig {
        MoralisConfig {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            chain: self.chain.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Settings for the fetch pipeline
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            min_followers: self.min_followers,
            workers: self.fetch_workers,
        }
    }
}

/// Parse env var with default fallback
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Tests
// ============================================================================
