/// Similar-user search by Jaccard index over top-token symbols
///
/// Tokens are compared by symbol only. Two contracts that share a symbol count
/// as the same token here.

use rustc_hash::FxHashSet;

use crate::models::PortfolioRow;

/// How many similar users the explorer shows
pub const SIMILAR_USERS_LIMIT: usize = 3;

/// Another user's row ranked by overlap with the queried user's holdings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarUser<'a> {
    pub row: &'a PortfolioRow,
    pub similarity: f64,
}

/// |A ∩ B| / |A ∪ B|, or 0.0 when both sets are empty
pub fn jaccard_similarity<T: Eq + std::hash::Hash>(a: &FxHashSet<T>, b: &FxHashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Distinct symbols held in a row's populated slots
pub fn symbol_set(row: &PortfolioRow) -> FxHashSet<&str> {
    row.tokens.symbols().collect()
}

/// Rank every other row by similarity to `target`, best first
///
/// Rows with the same `fname` as the target are skipped. Equal scores keep the
/// order of `rows`. At most `limit` users are returned.
pub fn similar_users<'a>(
    target: &PortfolioRow,
    rows: &'a [PortfolioRow],
    limit: usize,
) -> Vec<SimilarUser<'a>> {
    let target_symbols = symbol_set(target);

    let mut scored: Vec<SimilarUser<'a>> = rows
        .iter()
        .filter(|row| row.fname != target.fname)
        .map(|row| SimilarUser {
            row,
            similarity: jaccard_similarity(&target_symbols, &symbol_set(row)),
        })
        .collect();

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(limit);
    scored
}
