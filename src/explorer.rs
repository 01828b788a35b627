/// Read-only views over the aggregated balances
///
/// Joins the aggregated CSV with the source user list (by `fname`) and serves
/// three views: one user's portfolio, users with similar holdings, and the
/// global token popularity table. Nothing here mutates the loaded data.
///
/// # Example
///
/// ```no_run
/// use fc_token_insights::explorer::Explorer;
///
/// let explorer = Explorer::load("aggregated_token_balances_v2.csv", "All_Active_Farcaster_Users.csv")?;
/// let view = explorer.user("dwr")?;
/// for slice in view.chart_slices() {
///     println!("{}: {:.1}%", slice.symbol, slice.share_pct);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::{PopularityEntry, PortfolioRow, UserRecord};
use crate::popularity::token_popularity;
use crate::similarity::{SIMILAR_USERS_LIMIT, similar_users};
use crate::snapshot::read_rows;
use crate::users::load_users;

/// Operator-correctable lookup errors
#[derive(Debug, Error, PartialEq)]
pub enum ExplorerError {
    #[error("User not found: {0:?}. Please enter a valid username.")]
    UserNotFound(String),
}

/// One holding as shown in the portfolio table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingView {
    /// 1-based position among the user's populated holdings. Slots that were
    /// empty in the CSV are not counted, so this can be lower than the column
    /// number the holding was read from.
    pub slot: usize,
    pub symbol: String,
    pub address: String,
    pub usd_value: f64,
    /// Dexscreener page for the token, when the address is known
    pub url: Option<String>,
}

/// Pie chart input: one slice per positive holding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub symbol: String,
    pub usd_value: f64,
    pub share_pct: f64,
}

/// Everything the portfolio view shows for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub fid: i64,
    pub fname: String,
    pub profile_url: Option<String>,
    pub holdings: Vec<HoldingView>,
}

/// A similar user's full card: portfolio plus overlap score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarUserView {
    pub similarity: f64,
    #[serde(flatten)]
    pub user: UserView,
}

impl UserView {
    pub fn total_value(&self) -> f64 {
        self.holdings.iter().map(|h| h.usd_value).sum()
    }

    /// Slices for holdings worth more than zero, with their share of the positive total
    pub fn chart_slices(&self) -> Vec<ChartSlice> {
        let positive: Vec<&HoldingView> = self.holdings.iter().filter(|h| h.usd_value > 0.0).collect();
        let total: f64 = positive.iter().map(|h| h.usd_value).sum();
        if total <= 0.0 {
            return Vec::new();
        }

        positive
            .into_iter()
            .map(|h| ChartSlice {
                symbol: h.symbol.clone(),
                usd_value: h.usd_value,
                share_pct: h.usd_value / total * 100.0,
            })
            .collect()
    }
}

/// Loaded, joined data for the explorer views
#[derive(Debug, Clone, Default)]
pub struct Explorer {
    rows: Vec<PortfolioRow>,
    profile_urls: FxHashMap<String, String>,
}

impl Explorer {
    /// Join aggregated rows with the user list
    ///
    /// When a handle appears more than once in the user list, the first entry
    /// with a usable profile link is kept.
    pub fn new(rows: Vec<PortfolioRow>, users: &[UserRecord]) -> Self {
        let mut profile_urls = FxHashMap::default();
        for user in users {
            if let Some(url) = &user.profile_url {
                profile_urls.entry(user.fname.clone()).or_insert_with(|| url.clone());
            }
        }
        Self { rows, profile_urls }
    }

    /// Load both CSVs from disk; either file missing is an error
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(balances_csv: P, users_csv: Q) -> Result<Self> {
        let balances = read_rows(balances_csv).context("Failed to load aggregated balances")?;
        let users = load_users(users_csv).context("Failed to load user list")?;
        info!(
            rows = balances.rows.len(),
            skipped_rows = balances.malformed_rows,
            users = users.users.len(),
            skipped_users = users.malformed_rows,
            "Loaded explorer data"
        );
        Ok(Self::new(balances.rows, &users.users))
    }

    pub fn rows(&self) -> &[PortfolioRow] {
        &self.rows
    }

    fn find_row(&self, fname: &str) -> Result<&PortfolioRow, ExplorerError> {
        let fname = fname.trim();
        self.rows
            .iter()
            .find(|row| row.fname == fname)
            .ok_or_else(|| ExplorerError::UserNotFound(fname.to_string()))
    }

    fn view(&self, row: &PortfolioRow) -> UserView {
        let holdings = row
            .tokens
            .iter()
            .enumerate()
            .map(|(idx, h)| HoldingView {
                slot: idx + 1,
                symbol: h.symbol.clone(),
                address: h.address.clone(),
                usd_value: h.usd_value,
                url: h.dexscreener_url(),
            })
            .collect();

        UserView {
            fid: row.fid,
            fname: row.fname.clone(),
            profile_url: self.profile_urls.get(&row.fname).cloned(),
            holdings,
        }
    }

    /// Portfolio view for a handle
    pub fn user(&self, fname: &str) -> Result<UserView, ExplorerError> {
        let row = self.find_row(fname)?;
        Ok(self.view(row))
    }

    /// The three users whose top-token symbols overlap most with `fname`'s,
    /// each with their own profile link and holdings
    pub fn similar_users(&self, fname: &str) -> Result<Vec<SimilarUserView>, ExplorerError> {
        let row = self.find_row(fname)?;
        Ok(similar_users(row, &self.rows, SIMILAR_USERS_LIMIT)
            .into_iter()
            .map(|similar| SimilarUserView {
                similarity: similar.similarity,
                user: self.view(similar.row),
            })
            .collect())
    }

    /// Profile link for a handle, if the user list had one
    pub fn profile_url(&self, fname: &str) -> Option<&str> {
        self.profile_urls.get(fname.trim()).map(String::as_str)
    }

    /// Top-50 popularity table over all loaded rows
    pub fn popularity(&self) -> Vec<PopularityEntry> {
        token_popularity(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TokenHolding, TopTokens};

    fn row(fid: i64, fname: &str, holdings: &[(&str, &str, f64)]) -> PortfolioRow {
        PortfolioRow {
            fid,
            fname: fname.to_string(),
            tokens: TopTokens::from_ranked(
                holdings
                    .iter()
                    .map(|(s, a, v)| TokenHolding::new(s, a, *v))
                    .collect(),
            ),
        }
    }

    fn user(fname: &str, url: Option<&str>) -> UserRecord {
        UserRecord {
            fid: 0,
            fname: fname.to_string(),
            addresses: String::new(),
            followers: 0,
            profile_url: url.map(str::to_string),
        }
    }

    fn explorer() -> Explorer {
        let rows = vec![
            row(1, "alice", &[("ETH", "0xe", 75.0), ("DEGEN", "0xd", 25.0), ("DUST", "", 0.0)]),
            row(2, "bob", &[("ETH", "0xe", 10.0), ("DEGEN", "0xd", 1.0)]),
            row(3, "carol", &[("USDC", "0xu", 10.0)]),
        ];
        let users = vec![
            user("alice", None),
            user("alice", Some("https://warpcast.com/alice")),
            user("bob", Some("https://warpcast.com/bob")),
            user("bob", Some("https://warpcast.com/bob-dup")),
        ];
        Explorer::new(rows, &users)
    }

    #[test]
    fn test_user_view() {
        let explorer = explorer();
        let view = explorer.user("  alice ").expect("alice should exist");

        assert_eq!(view.fid, 1);
        assert_eq!(view.profile_url.as_deref(), Some("https://warpcast.com/alice"));
        assert_eq!(view.holdings.len(), 3);
        assert_eq!(view.holdings[0].slot, 1);
        assert_eq!(view.holdings[0].url.as_deref(), Some("https://dexscreener.com/base/0xe"));
        assert_eq!(view.holdings[2].url, None);
        assert_eq!(view.total_value(), 100.0);
    }

    #[test]
    fn test_first_profile_link_wins() {
        let explorer = explorer();
        assert_eq!(explorer.profile_url("bob"), Some("https://warpcast.com/bob"));
        assert_eq!(explorer.profile_url("carol"), None);
    }

    #[test]
    fn test_unknown_user_is_an_error() {
        let explorer = explorer();
        let err = explorer.user("mallory").unwrap_err();
        assert_eq!(err, ExplorerError::UserNotFound("mallory".to_string()));
        assert!(err.to_string().contains("User not found"));
        assert!(explorer.similar_users("mallory").is_err());
        // Nothing changed
        assert_eq!(explorer.rows().len(), 3);
    }

    #[test]
    fn test_similar_users_carry_profile_and_holdings() {
        let explorer = explorer();
        let similar = explorer.similar_users("alice").unwrap();

        let bob = &similar[0].user;
        assert_eq!(bob.fid, 2);
        assert_eq!(bob.profile_url.as_deref(), Some("https://warpcast.com/bob"));
        assert_eq!(bob.holdings.len(), 2);
        assert_eq!(bob.holdings[0].symbol, "ETH");
        assert_eq!(bob.holdings[0].usd_value, 10.0);
        assert_eq!(bob.holdings[1].url.as_deref(), Some("https://dexscreener.com/base/0xd"));

        let carol = &similar[1].user;
        assert_eq!(carol.profile_url, None);
        assert_eq!(carol.holdings[0].symbol, "USDC");

        let json = serde_json::to_value(&similar[0]).unwrap();
        assert_eq!(json["fname"], "bob");
        assert_eq!(json["profile_url"], "https://warpcast.com/bob");
        assert_eq!(json["holdings"][0]["symbol"], "ETH");
        assert!(json["similarity"].as_f64().is_some());
    }

    #[test]
    fn test_chart_slices_skip_non_positive() {
        let view = explorer().user("alice").unwrap();
        let slices = view.chart_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].symbol, "ETH");
        assert_eq!(slices[0].share_pct, 75.0);
        assert_eq!(slices[1].share_pct, 25.0);
    }

    #[test]
    fn test_chart_slices_empty_portfolio() {
        let explorer = Explorer::new(vec![row(9, "empty", &[])], &[]);
        assert!(explorer.user("empty").unwrap().chart_slices().is_empty());
    }

    #[test]
    fn test_similar_users_and_popularity() {
        let explorer = explorer();

        let similar = explorer.similar_users("alice").unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].user.fname, "bob");
        assert!((similar[0].similarity - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(similar[1].user.fname, "carol");
        assert_eq!(similar[1].similarity, 0.0);

        let popularity = explorer.popularity();
        assert_eq!(popularity[0].symbol, "ETH");
        assert_eq!(popularity[0].holders, 2);
        assert_eq!(popularity[0].total_value, 85.0);
        assert_eq!(popularity[1].symbol, "DEGEN");
    }
}
