//! Balance fetch pipeline
//!
//! Filters the user list by follower count, looks up every candidate address,
//! and produces one [`PortfolioRow`] per remaining user in input order.
//!
//! With `workers == 1` users are processed one at a time on the calling
//! thread. Larger values spread users over a fixed pool of scoped threads;
//! the output order does not depend on the worker count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info};

use crate::addresses::{extract_wallet_addresses, filter_by_followers};
use crate::aggregator::aggregate_portfolio;
use crate::balances::BalanceLookup;
use crate::models::{PortfolioRow, UserRecord};

/// Default follower threshold for users worth fetching
pub const DEFAULT_MIN_FOLLOWERS: i64 = 3000;

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Users below this follower count are skipped (inclusive threshold)
    pub min_followers: i64,
    /// Number of users fetched concurrently (1 = sequential)
    pub workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_followers: DEFAULT_MIN_FOLLOWERS,
            workers: 1,
        }
    }
}

/// Rows produced by a run plus counters for the summary
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub rows: Vec<PortfolioRow>,
    /// Users in the input list
    pub users_total: usize,
    /// Users that met the follower threshold
    pub users_considered: usize,
    /// Valid addresses whose lookup succeeded
    pub addresses_queried: usize,
    /// Addresses whose lookup failed and were left out
    pub failed_addresses: Vec<String>,
}

impl FetchReport {
    /// Rows that ended up with at least one token
    pub fn rows_with_tokens(&self) -> usize {
        self.rows.iter().filter(|r| !r.tokens.is_empty()).count()
    }
}

/// Result for one user before it is merged into the report
struct UserFetch {
    row: PortfolioRow,
    queried: usize,
    failed_addresses: Vec<String>,
}

fn fetch_user<L: BalanceLookup + ?Sized>(user: &UserRecord, lookup: &L) -> UserFetch {
    let addresses = extract_wallet_addresses(&user.addresses);
    debug!(fid = user.fid, fname = %user.fname, addresses = addresses.len(), "fetching user");

    let outcome = aggregate_portfolio(&addresses, lookup);
    let tokens = outcome.portfolio.top_tokens();

    UserFetch {
        row: PortfolioRow {
            fid: user.fid,
            fname: user.fname.clone(),
            tokens,
        },
        queried: outcome.queried,
        failed_addresses: outcome.failed_addresses,
    }
}

fn fetch_sequential<L: BalanceLookup + ?Sized>(users: &[&UserRecord], lookup: &L) -> Vec<UserFetch> {
    let total = users.len();
    users
        .iter()
        .enumerate()
        .map(|(idx, user)| {
            let fetched = fetch_user(user, lookup);
            info!(
                "[{}/{}] {}: {} tokens",
                idx + 1,
                total,
                fetched.row.fname,
                fetched.row.tokens.len()
            );
            fetched
        })
        .collect()
}

fn fetch_parallel<L: BalanceLookup + Sync + ?Sized>(
    users: &[&UserRecord],
    workers: usize,
    lookup: &L,
) -> Vec<UserFetch> {
    let total = users.len();
    let next = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, UserFetch)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let done = &done;
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    if idx >= total {
                        break;
                    }
                    let fetched = fetch_user(users[idx], lookup);
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(
                        "[{}/{}] {}: {} tokens",
                        finished,
                        total,
                        fetched.row.fname,
                        fetched.row.tokens.len()
                    );
                    // Receiver outlives the scope, so send cannot fail here
                    let _ = tx.send((idx, fetched));
                }
            });
        }
    });
    drop(tx);

    let mut results: Vec<(usize, UserFetch)> = rx.into_iter().collect();
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, fetched)| fetched).collect()
}

/// Run the whole fetch over `users`
pub fn run_fetch<L: BalanceLookup + Sync + ?Sized>(
    users: &[UserRecord],
    config: &FetchConfig,
    lookup: &L,
) -> FetchReport {
    let candidates = filter_by_followers(users, config.min_followers);
    info!(
        total = users.len(),
        candidates = candidates.len(),
        min_followers = config.min_followers,
        "Filtered user list"
    );

    let workers = config.workers.clamp(1, candidates.len().max(1));
    let fetched = if workers == 1 {
        fetch_sequential(&candidates, lookup)
    } else {
        info!(workers, "Fetching with worker pool");
        fetch_parallel(&candidates, workers, lookup)
    };

    let mut report = FetchReport {
        users_total: users.len(),
        users_considered: candidates.len(),
        ..FetchReport::default()
    };
    for user in fetched {
        report.addresses_queried += user.queried;
        report.failed_addresses.extend(user.failed_addresses);
        report.rows.push(user.row);
    }

    report
}
