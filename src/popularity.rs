/// Global token popularity across all users' top slots
///
/// Every populated slot counts as one holder of its symbol and adds its value
/// to the symbol's total. Like similarity, identity is by symbol only.

use rustc_hash::FxHashMap;

use crate::models::{MAX_TOKEN_SLOTS, PopularityEntry, PortfolioRow};

/// Number of symbols in the popularity table
pub const POPULARITY_LIMIT: usize = 50;

/// Accumulate holders and value per symbol, unsorted, in first-seen order
///
/// Rows are walked slot by slot (every row's slot 1, then every row's slot 2,
/// and so on), which fixes the first-seen order used for complete ties.
pub fn accumulate_popularity(rows: &[PortfolioRow]) -> Vec<PopularityEntry> {
    let mut entries: Vec<PopularityEntry> = Vec::new();
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();

    for slot in 1..=MAX_TOKEN_SLOTS {
        for row in rows {
            let Some(holding) = row.tokens.slot(slot) else {
                continue;
            };
            match index.get(holding.symbol.as_str()) {
                Some(&idx) => {
                    entries[idx].holders += 1;
                    entries[idx].total_value += holding.usd_value;
                }
                None => {
                    index.insert(holding.symbol.as_str(), entries.len());
                    entries.push(PopularityEntry {
                        symbol: holding.symbol.clone(),
                        holders: 1,
                        total_value: holding.usd_value,
                    });
                }
            }
        }
    }

    entries
}

/// Sort by holder count, then total value, both descending; keep the first `limit`
pub fn rank_tokens(mut entries: Vec<PopularityEntry>, limit: usize) -> Vec<PopularityEntry> {
    entries.sort_by(|a, b| {
        b.holders
            .cmp(&a.holders)
            .then_with(|| b.total_value.total_cmp(&a.total_value))
    });
    entries.truncate(limit);
    entries
}

/// The top-50 popularity table
pub fn token_popularity(rows: &[PortfolioRow]) -> Vec<PopularityEntry> {
    rank_tokens(accumulate_popularity(rows), POPULARITY_LIMIT)
}
