/// Wallet address extraction from the user list
/// The `addresses` column holds zero or more `|`-separated candidates

use crate::models::UserRecord;

/// Length of a `0x`-prefixed EVM address
pub const WALLET_ADDRESS_LEN: usize = 42;

/// Returns true if `candidate` looks like a wallet address
///
/// Only the `0x` prefix and total length are checked. Hex digits and
/// checksums are not validated.
///
/// # Examples
/// ```
/// use fc_token_insights::addresses::is_candidate_address;
///
/// assert!(is_candidate_address("0x4ed4e862860bed51a9570b96d89af5e1b0efefed"));
/// assert!(!is_candidate_address("0x4ed4e862860bed51a9570b96d89af5e1b0efefe"));
/// ```
pub fn is_candidate_address(candidate: &str) -> bool {
    candidate.starts_with("0x") && candidate.len() == WALLET_ADDRESS_LEN
}

/// Splits a raw pipe-delimited field and keeps the candidates that pass
/// [`is_candidate_address`]
///
/// Each piece is trimmed first. Order is preserved and duplicates are kept.
/// An empty or garbage field yields an empty vector.
pub fn extract_wallet_addresses(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|piece| is_candidate_address(piece))
        .map(str::to_string)
        .collect()
}

/// Users with at least `min_followers` followers, in input order
pub fn filter_by_followers(users: &[UserRecord], min_followers: i64) -> Vec<&UserRecord> {
    users.iter().filter(|u| u.followers >= min_followers).collect()
}
