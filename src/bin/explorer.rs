// explorer.rs - Inspect the aggregated token balances
//
// Usage:
//   cargo run --bin explorer -- user dwr                     # Portfolio + similar users
//   cargo run --bin explorer -- popular                      # Top 50 tokens by holders
//   cargo run --bin explorer -- --format json user dwr       # Output as JSON
//   cargo run --bin explorer -- --balances other.csv popular # Use another snapshot

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::json;
use std::io::{self, Write};

use fc_token_insights::explorer::{Explorer, SimilarUserView, UserView};
use fc_token_insights::models::PopularityEntry;
use fc_token_insights::settings::{BALANCES_CSV, USERS_CSV, init_logging};

#[derive(Parser, Debug)]
#[command(name = "explorer")]
#[command(about = "Explore aggregated Farcaster token holdings")]
struct Args {
    /// Aggregated balances CSV written by fetch_balances
    #[arg(long, default_value = BALANCES_CSV)]
    balances: String,

    /// Source user list (for profile links)
    #[arg(long, default_value = USERS_CSV)]
    users: String,

    /// Output format: table, csv, json
    #[arg(long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one user's portfolio and the most similar users
    User {
        /// Farcaster handle (fname)
        fname: String,
    },
    /// Show the most popular tokens across all users
    Popular,
}

fn main() -> Result<()> {
    dotenv().ok();
    init_logging();
    let args = Args::parse();

    match args.format.to_lowercase().as_str() {
        "table" | "csv" | "json" => {}
        _ => anyhow::bail!("Invalid format: {}. Use table, csv, or json", args.format),
    }
    let format = args.format.to_lowercase();

    let explorer = Explorer::load(&args.balances, &args.users)?;

    match args.command {
        Command::User { fname } => {
            let view = match explorer.user(&fname) {
                Ok(view) => view,
                Err(e) => {
                    // Not fatal: tell the operator and let them retry
                    eprintln!("Error: {}", e);
                    return Ok(());
                }
            };
            let similar = explorer.similar_users(&view.fname)?;
            match format.as_str() {
                "csv" => write_user_csv(io::stdout(), &view)?,
                "json" => print_user_json(&view, &similar)?,
                _ => print_user_table(&view, &similar),
            }
        }
        Command::Popular => {
            let ranked = explorer.popularity();
            match format.as_str() {
                "csv" => write_popularity_csv(io::stdout(), &ranked)?,
                "json" => println!("{}", serde_json::to_string_pretty(&ranked)?),
                _ => print_popularity_table(&ranked),
            }
        }
    }

    Ok(())
}

/// Token table shared by the user card and the similar-user cards
fn print_holdings(view: &UserView) {
    if view.holdings.is_empty() {
        println!("No token holdings recorded.");
        return;
    }

    println!("{:<4} {:<12} {:>14}  {}", "#", "Token", "Value", "Link");
    println!("{}", "-".repeat(85));
    for h in &view.holdings {
        println!(
            "{:<4} {:<12} {:>14}  {}",
            h.slot,
            truncate_label(&h.symbol, 12),
            format!("${:.2}", h.usd_value),
            h.url.as_deref().unwrap_or("-"),
        );
    }
    println!("{}", "-".repeat(85));
    println!("{:<4} {:<12} {:>14}", "", "TOTAL", format!("${:.2}", view.total_value()));
}

/// Print a user's portfolio, chart shares and similar users
fn print_user_table(view: &UserView, similar: &[SimilarUserView]) {
    println!("\n=== {} (fid {}) ===", view.fname, view.fid);
    if let Some(url) = &view.profile_url {
        println!("Profile: {}", url);
    }
    println!();
    print_holdings(view);

    let slices = view.chart_slices();
    if !slices.is_empty() {
        println!("\nPortfolio share:");
        for slice in slices {
            println!("  {:<12} {:>6.1}%", truncate_label(&slice.symbol, 12), slice.share_pct);
        }
    }

    println!("\nSimilar users:");
    if similar.is_empty() {
        println!("  (none)");
    }
    for entry in similar {
        let user = &entry.user;
        println!("\n--- {} (similarity {:.2}) ---", user.fname, entry.similarity);
        if let Some(url) = &user.profile_url {
            println!("Profile: {}", url);
        }
        print_holdings(user);
    }
}

fn write_user_csv<W: Write>(out: W, view: &UserView) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["slot", "symbol", "address", "usd_value", "url"])?;
    for h in &view.holdings {
        wtr.write_record([
            h.slot.to_string(),
            h.symbol.clone(),
            h.address.clone(),
            format!("{:.2}", h.usd_value),
            h.url.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_user_json(view: &UserView, similar: &[SimilarUserView]) -> Result<()> {
    let out = json!({
        "user": view,
        "total_value": view.total_value(),
        "chart": view.chart_slices(),
        "similar_users": similar,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Print the popularity ranking as a table
fn print_popularity_table(ranked: &[PopularityEntry]) {
    println!("\n=== TOP {} MOST POPULAR TOKENS ===\n", ranked.len());
    if ranked.is_empty() {
        println!("No token data found.");
        return;
    }

    println!("{:<5} {:<15} {:>8} {:>18}", "Rank", "Token", "Holders", "Total Value");
    println!("{}", "-".repeat(50));
    for (idx, entry) in ranked.iter().enumerate() {
        println!(
            "{:<5} {:<15} {:>8} {:>18}",
            idx + 1,
            truncate_label(&entry.symbol, 15),
            entry.holders,
            format!("${}", format_thousands(entry.total_value)),
        );
    }
}

fn write_popularity_csv<W: Write>(out: W, ranked: &[PopularityEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["rank", "symbol", "holders", "total_value"])?;
    for (idx, entry) in ranked.iter().enumerate() {
        wtr.write_record([
            (idx + 1).to_string(),
            entry.symbol.clone(),
            entry.holders.to_string(),
            format!("{:.2}", entry.total_value),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Truncate label to max length
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() > max_len {
        let head: String = label.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Two decimals with comma thousands separators, e.g. 1234567.891 -> "1,234,567.89"
fn format_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
