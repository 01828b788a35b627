//! Farcaster token holdings: balance fetching, aggregation and ranking
//!
//! The `fetch_balances` binary builds the aggregated CSV from a user list;
//! the `explorer` binary reads it back for per-user and global views.

pub mod addresses;
pub mod aggregator;
pub mod balances;
pub mod explorer;
pub mod fetcher;
pub mod models;
pub mod popularity;
pub mod settings;
pub mod similarity;
pub mod snapshot;
pub mod users;

pub use balances::{BalanceLookup, FetchError, MoralisClient};
pub use explorer::{Explorer, ExplorerError};
pub use models::{PopularityEntry, PortfolioRow, TokenBalance, TokenHolding, TopTokens, UserRecord};
