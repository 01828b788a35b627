// Aggregated balances CSV
//
// One row per user: fid, fname, then for each slot i in 1..=10 the columns
// token_{i}_symbol, token_{i}_address, token_{i}_usd_value. Unused slots are
// written as empty fields so "no token" never reads back as a zero balance.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

use crate::models::{MAX_TOKEN_SLOTS, PortfolioRow, TokenHolding, TopTokens};

pub fn symbol_column(slot: usize) -> String {
    format!("token_{}_symbol", slot)
}

pub fn address_column(slot: usize) -> String {
    format!("token_{}_address", slot)
}

pub fn value_column(slot: usize) -> String {
    format!("token_{}_usd_value", slot)
}

/// Full header row of the aggregated CSV
pub fn header() -> Vec<String> {
    let mut columns = vec!["fid".to_string(), "fname".to_string()];
    for slot in 1..=MAX_TOKEN_SLOTS {
        columns.push(symbol_column(slot));
        columns.push(address_column(slot));
        columns.push(value_column(slot));
    }
    columns
}

/// Flatten one row into CSV fields
fn to_record(row: &PortfolioRow) -> Vec<String> {
    let mut fields = Vec::with_capacity(2 + MAX_TOKEN_SLOTS * 3);
    fields.push(row.fid.to_string());
    fields.push(row.fname.clone());
    for slot in 1..=MAX_TOKEN_SLOTS {
        match row.tokens.slot(slot) {
            Some(holding) => {
                fields.push(holding.symbol.clone());
                fields.push(holding.address.clone());
                fields.push(holding.usd_value.to_string());
            }
            None => fields.extend([String::new(), String::new(), String::new()]),
        }
    }
    fields
}

/// Write rows (with header) to any writer
pub fn write_rows_to<W: Write>(writer: W, rows: &[PortfolioRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header())?;
    for row in rows {
        wtr.write_record(to_record(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write rows to a CSV file, replacing it
pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[PortfolioRow]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows_to(file, rows)
}

/// Parsed rows plus the number of lines that had to be skipped
#[derive(Debug, Default)]
pub struct SnapshotReadResult {
    pub rows: Vec<PortfolioRow>,
    pub malformed_rows: usize,
}

/// Column positions resolved from the header
struct Columns {
    fid: usize,
    fname: usize,
    slots: Vec<(Option<usize>, Option<usize>, Option<usize>)>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let fid = find("fid").context("Aggregated CSV is missing the fid column")?;
        let fname = find("fname").context("Aggregated CSV is missing the fname column")?;
        let slots = (1..=MAX_TOKEN_SLOTS)
            .map(|slot| {
                (
                    find(&symbol_column(slot)),
                    find(&address_column(slot)),
                    find(&value_column(slot)),
                )
            })
            .collect();
        Ok(Self { fid, fname, slots })
    }
}

fn non_empty<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

/// Parse an integer column; tolerates float-formatted values such as `123.0`
pub(crate) fn parse_integer(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }
    let as_float: f64 = raw.parse().with_context(|| format!("Invalid integer: {:?}", raw))?;
    if as_float.fract() != 0.0 {
        anyhow::bail!("Invalid integer: {:?}", raw);
    }
    Ok(as_float as i64)
}

/// Parse one data row
///
/// Slots missing a symbol or a value are dropped and the later holdings close
/// the gap, so the returned slot positions count populated slots only and may
/// differ from the `token_{i}_*` column numbers.
fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Result<PortfolioRow> {
    let fid = parse_integer(record.get(columns.fid).context("Missing fid")?)?;
    let fname = record.get(columns.fname).context("Missing fname")?.trim().to_string();

    let mut holdings = Vec::new();
    for (slot, &(symbol_idx, address_idx, value_idx)) in columns.slots.iter().enumerate() {
        // A slot is populated only when both symbol and value are present
        let (Some(symbol), Some(value)) = (non_empty(record, symbol_idx), non_empty(record, value_idx)) else {
            continue;
        };
        let usd_value: f64 = value
            .parse()
            .with_context(|| format!("Invalid usd value in slot {}: {:?}", slot + 1, value))?;
        let address = non_empty(record, address_idx).unwrap_or_default();
        holdings.push(TokenHolding::new(symbol, address, usd_value));
    }

    Ok(PortfolioRow {
        fid,
        fname,
        tokens: TopTokens::from_ranked(holdings),
    })
}

/// Read rows from any reader; bad lines are logged and skipped
pub fn read_rows_from<R: Read>(reader: R) -> Result<SnapshotReadResult> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut result = SnapshotReadResult::default();
    for (line, record) in rdr.records().enumerate() {
        // +2: header line plus 1-based numbering
        let line_num = line + 2;
        let parsed = record
            .map_err(anyhow::Error::from)
            .and_then(|r| parse_record(&r, &columns));
        match parsed {
            Ok(row) => result.rows.push(row),
            Err(e) => {
                warn!(line = line_num, error = %e, "Skipping malformed aggregated row");
                result.malformed_rows += 1;
            }
        }
    }

    Ok(result)
}

/// Read the aggregated CSV from disk; a missing file is an error
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<SnapshotReadResult> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open aggregated balances file {}", path.display()))?;
    read_rows_from(file)
}
