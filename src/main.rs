/// Farcaster balance fetcher - Main entry point
/// Looks up token balances for every qualifying user and writes the aggregated CSV

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};

use fc_token_insights::balances::MoralisClient;
use fc_token_insights::fetcher::{FetchReport, run_fetch};
use fc_token_insights::settings::{Config, PREVIEW_ROWS, init_logging};
use fc_token_insights::snapshot::write_rows;
use fc_token_insights::users::load_users;

fn log_preview(report: &FetchReport) {
    for row in report.rows.iter().take(PREVIEW_ROWS) {
        let tokens: Vec<String> = row
            .tokens
            .iter()
            .map(|h| format!("{}=${:.2}", h.symbol, h.usd_value))
            .collect();
        info!(fid = row.fid, fname = %row.fname, "{}", tokens.join(", "));
    }
}

fn print_summary(report: &FetchReport, output: &str) {
    println!("\nFetch Summary:");
    println!("Users in list:        {:>6}", report.users_total);
    println!("Users fetched:        {:>6}", report.users_considered);
    println!("Users with tokens:    {:>6}", report.rows_with_tokens());
    println!("Addresses queried:    {:>6}", report.addresses_queried);
    println!("Failed lookups:       {:>6}", report.failed_addresses.len());
    println!("Output:               {}", output);
}

fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = Config::from_env()?;
    info!(
        users_csv = %cfg.users_csv,
        chain = %cfg.chain,
        min_followers = cfg.min_followers,
        workers = cfg.fetch_workers,
        "Starting balance fetch"
    );

    let users = load_users(&cfg.users_csv)?;
    if users.malformed_rows > 0 {
        warn!(skipped = users.malformed_rows, "Some user rows could not be parsed");
    }

    let client = MoralisClient::new(cfg.moralis_config())?;
    let report = run_fetch(&users.users, &cfg.fetch_config(), &client);

    log_preview(&report);

    write_rows(&cfg.balances_csv, &report.rows)
        .with_context(|| format!("Failed to write {}", cfg.balances_csv))?;

    print_summary(&report, &cfg.balances_csv);
    Ok(())
}
