//! Portfolio Aggregation Module
//!
//! Sums token balances across all of a user's wallet addresses, keyed by
//! (symbol, contract address), and ranks the result into the top token slots.
//! A failed lookup for one address is logged and skipped; the rest of the
//! user's addresses still count.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::balances::BalanceLookup;
use crate::models::{MAX_TOKEN_SLOTS, TokenBalance, TokenHolding, TopTokens};

/// Per-user token values keyed by (symbol, contract address)
///
/// Keeps first-insertion order so that ranking ties resolve the same way
/// every time.
#[derive(Debug, Clone, Default)]
pub struct AggregatedPortfolio {
    entries: Vec<TokenHolding>,
    index: FxHashMap<(String, String), usize>,
}

impl AggregatedPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `usd_value` to the running total for (symbol, address)
    pub fn add(&mut self, symbol: &str, address: &str, usd_value: f64) {
        let key = (symbol.to_string(), address.to_string());
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].usd_value += usd_value,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(TokenHolding::new(symbol, address, usd_value));
            }
        }
    }

    /// Fold one lookup result into the portfolio; balances without a USD value are ignored
    pub fn add_balances(&mut self, balances: &[TokenBalance]) {
        for balance in balances {
            if let Some(value) = balance.usd_value {
                self.add(&balance.symbol, &balance.token_address, value);
            }
        }
    }

    /// Summed value for (symbol, address), if the pair was seen
    pub fn get(&self, symbol: &str, address: &str) -> Option<f64> {
        self.index
            .get(&(symbol.to_string(), address.to_string()))
            .map(|&idx| self.entries[idx].usd_value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TokenHolding> {
        self.entries.iter()
    }

    /// The `limit` most valuable holdings, highest first
    ///
    /// Uses a stable sort so equal values keep insertion order.
    pub fn ranked(&self, limit: usize) -> Vec<TokenHolding> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.usd_value.total_cmp(&a.usd_value));
        ranked.truncate(limit);
        ranked
    }

    /// Holdings for the persisted token slots
    pub fn top_tokens(&self) -> TopTokens {
        TopTokens::from_ranked(self.ranked(MAX_TOKEN_SLOTS))
    }
}

/// Result of aggregating one user's addresses
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub portfolio: AggregatedPortfolio,
    /// Addresses that were queried successfully
    pub queried: usize,
    /// Addresses whose lookup failed and were left out
    pub failed_addresses: Vec<String>,
}

/// Look up every address and sum the balances into one portfolio
///
/// Lookups run one at a time in the order given. Failures are logged with the
/// address and do not stop the remaining lookups. No retry is attempted here.
pub fn aggregate_portfolio<L: BalanceLookup + ?Sized>(
    addresses: &[String],
    lookup: &L,
) -> AggregationOutcome {
    let mut outcome = AggregationOutcome::default();

    for address in addresses {
        match lookup.token_balances(address) {
            Ok(balances) => {
                outcome.portfolio.add_balances(&balances);
                outcome.queried += 1;
            }
            Err(e) => {
                warn!(%address, error = %e, "Failed to fetch data for address");
                outcome.failed_addresses.push(address.clone());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::FetchError;
    use std::collections::HashMap;

    const ADDR_1: &str = "0x1111111111111111111111111111111111111111";
    const ADDR_2: &str = "0x2222222222222222222222222222222222222222";
    const ADDR_3: &str = "0x3333333333333333333333333333333333333333";

    /// In-memory lookup; addresses without an entry fail
    struct StubLookup {
        balances: HashMap<String, Vec<TokenBalance>>,
    }

    impl StubLookup {
        fn new(entries: Vec<(&str, Vec<TokenBalance>)>) -> Self {
            Self {
                balances: entries
                    .into_iter()
                    .map(|(addr, b)| (addr.to_string(), b))
                    .collect(),
            }
        }
    }

    impl BalanceLookup for StubLookup {
        fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, FetchError> {
            self.balances
                .get(address)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 500,
                    body: "stub failure".to_string(),
                })
        }
    }

    fn sorted_entries(portfolio: &AggregatedPortfolio) -> Vec<(String, String, f64)> {
        let mut entries: Vec<_> = portfolio
            .iter()
            .map(|h| (h.symbol.clone(), h.address.clone(), h.usd_value))
            .collect();
        entries.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        entries
    }

    #[test]
    fn test_add_sums_same_key() {
        let mut portfolio = AggregatedPortfolio::new();
        portfolio.add("DEGEN", "0xd", 1.5);
        portfolio.add("DEGEN", "0xd", 2.25);
        portfolio.add("DEGEN", "0xother", 4.0);

        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.get("DEGEN", "0xd"), Some(3.75));
        assert_eq!(portfolio.get("DEGEN", "0xother"), Some(4.0));
        assert_eq!(portfolio.get("ETH", "0xd"), None);
    }

    #[test]
    fn test_null_values_are_skipped() {
        let mut portfolio = AggregatedPortfolio::new();
        portfolio.add_balances(&[
            TokenBalance::new("DEGEN", "0xd", Some(10.0)),
            TokenBalance::new("SPAM", "0xs", None),
            TokenBalance::new("DEGEN", "0xd", None),
        ]);

        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio.get("DEGEN", "0xd"), Some(10.0));
        assert_eq!(portfolio.get("SPAM", "0xs"), None);
    }

    #[test]
    fn test_aggregate_across_addresses() {
        let lookup = StubLookup::new(vec![
            (ADDR_1, vec![
                TokenBalance::new("ETH", "0xe", Some(100.0)),
                TokenBalance::new("DEGEN", "0xd", Some(5.0)),
            ]),
            (ADDR_2, vec![TokenBalance::new("ETH", "0xe", Some(50.0))]),
        ]);

        let addresses = vec![ADDR_1.to_string(), ADDR_2.to_string()];
        let outcome = aggregate_portfolio(&addresses, &lookup);

        assert_eq!(outcome.queried, 2);
        assert!(outcome.failed_addresses.is_empty());
        assert_eq!(outcome.portfolio.get("ETH", "0xe"), Some(150.0));
        assert_eq!(outcome.portfolio.get("DEGEN", "0xd"), Some(5.0));
    }

    #[test]
    fn test_failed_lookup_is_skipped_not_fatal() {
        let lookup = StubLookup::new(vec![
            (ADDR_1, vec![TokenBalance::new("ETH", "0xe", Some(1.0))]),
            (ADDR_3, vec![TokenBalance::new("ETH", "0xe", Some(2.0))]),
        ]);

        let addresses = vec![ADDR_1.to_string(), ADDR_2.to_string(), ADDR_3.to_string()];
        let outcome = aggregate_portfolio(&addresses, &lookup);

        assert_eq!(outcome.queried, 2);
        assert_eq!(outcome.failed_addresses, vec![ADDR_2.to_string()]);
        assert_eq!(outcome.portfolio.get("ETH", "0xe"), Some(3.0));
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let per_address = vec![
            (ADDR_1, vec![
                TokenBalance::new("ETH", "0xe", Some(0.5)),
                TokenBalance::new("USDC", "0xu", Some(8.0)),
            ]),
            (ADDR_2, vec![
                TokenBalance::new("USDC", "0xu", Some(2.25)),
                TokenBalance::new("DEGEN", "0xd", Some(1.0)),
            ]),
            (ADDR_3, vec![
                TokenBalance::new("ETH", "0xe", Some(4.0)),
                TokenBalance::new("DEGEN", "0xd", None),
            ]),
        ];
        let lookup = StubLookup::new(per_address);

        let orders = [
            [ADDR_1, ADDR_2, ADDR_3],
            [ADDR_3, ADDR_2, ADDR_1],
            [ADDR_2, ADDR_1, ADDR_3],
        ];

        let results: Vec<_> = orders
            .iter()
            .map(|order| {
                let addresses: Vec<String> = order.iter().map(|a| a.to_string()).collect();
                sorted_entries(&aggregate_portfolio(&addresses, &lookup).portfolio)
            })
            .collect();

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0].len(), 3);
    }

    #[test]
    fn test_ranked_breaks_ties_by_insertion_order() {
        let mut portfolio = AggregatedPortfolio::new();
        portfolio.add("A", "0xa", 5.0);
        portfolio.add("B", "0xb", 9.0);
        portfolio.add("C", "0xc", 9.0);
        portfolio.add("D", "0xd", 1.0);

        let symbols: Vec<String> = portfolio
            .top_tokens()
            .iter()
            .map(|h| h.symbol.clone())
            .collect();
        assert_eq!(symbols, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_top_tokens_capped_and_sorted() {
        let mut portfolio = AggregatedPortfolio::new();
        for i in 0..25 {
            let value = ((i * 7) % 25) as f64;
            portfolio.add(&format!("T{}", i), &format!("0x{}", i), value);
        }

        let top = portfolio.top_tokens();
        assert_eq!(top.len(), MAX_TOKEN_SLOTS);
        let values: Vec<f64> = top.iter().map(|h| h.usd_value).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(values[0], 24.0);
    }

    #[test]
    fn test_ranked_with_nan_value() {
        let mut portfolio = AggregatedPortfolio::new();
        portfolio.add("A", "0xa", 1.0);
        portfolio.add("BAD", "0xbad", f64::NAN);
        portfolio.add("B", "0xb", 3.0);
        portfolio.add("C", "0xc", 2.0);

        let ranked = portfolio.ranked(MAX_TOKEN_SLOTS);
        let finite: Vec<&str> = ranked
            .iter()
            .filter(|h| !h.usd_value.is_nan())
            .map(|h| h.symbol.as_str())
            .collect();
        assert_eq!(ranked.len(), 4);
        assert_eq!(finite, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_top_tokens_fewer_than_limit() {
        let mut portfolio = AggregatedPortfolio::new();
        portfolio.add("ETH", "0xe", 1.0);
        portfolio.add("DEGEN", "0xd", 2.0);

        let top = portfolio.top_tokens();
        assert_eq!(top.len(), 2);
        assert_eq!(top.slot(1).unwrap().symbol, "DEGEN");
        assert!(top.slot(3).is_none());
    }

    #[test]
    fn test_empty_addresses_give_empty_portfolio() {
        let lookup = StubLookup::new(vec![]);
        let outcome = aggregate_portfolio(&[], &lookup);
        assert!(outcome.portfolio.is_empty());
        assert!(outcome.portfolio.top_tokens().is_empty());
        assert_eq!(outcome.queried, 0);
    }
}
