/// Source user list loading
///
/// Expects at least the columns `fid`, `fname`, `followers` and `addresses`.
/// `fname_link` is optional and usually holds an HTML anchor such as
/// `<a href="https://warpcast.com/dwr">dwr</a>`; only its href is kept.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::models::UserRecord;
use crate::snapshot::parse_integer;

static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href=['"]?([^'" >]+)"#).expect("href pattern is a valid regex")
});

/// Pull the href target out of an HTML anchor; None if there is none
///
/// # Examples
/// ```
/// use fc_token_insights::users::extract_profile_url;
///
/// let url = extract_profile_url(r#"<a href="https://warpcast.com/dwr">dwr</a>"#);
/// assert_eq!(url.as_deref(), Some("https://warpcast.com/dwr"));
/// assert_eq!(extract_profile_url("dwr"), None);
/// ```
pub fn extract_profile_url(html: &str) -> Option<String> {
    HREF_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parsed users plus the number of lines that had to be skipped
#[derive(Debug, Default)]
pub struct UserListReadResult {
    pub users: Vec<UserRecord>,
    pub malformed_rows: usize,
}

struct Columns {
    fid: usize,
    fname: usize,
    followers: usize,
    addresses: usize,
    fname_link: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Ok(Self {
            fid: find("fid").context("User list is missing the fid column")?,
            fname: find("fname").context("User list is missing the fname column")?,
            followers: find("followers").context("User list is missing the followers column")?,
            addresses: find("addresses").context("User list is missing the addresses column")?,
            fname_link: find("fname_link"),
        })
    }
}

fn parse_user(record: &csv::StringRecord, columns: &Columns) -> Result<UserRecord> {
    let fid = parse_integer(record.get(columns.fid).context("Missing fid")?)
        .context("Failed to parse fid")?;
    let fname = record.get(columns.fname).context("Missing fname")?.trim().to_string();
    let followers = parse_integer(record.get(columns.followers).context("Missing followers")?)
        .context("Failed to parse followers")?;
    let addresses = record.get(columns.addresses).unwrap_or_default().to_string();
    let profile_url = columns
        .fname_link
        .and_then(|idx| record.get(idx))
        .and_then(extract_profile_url);

    Ok(UserRecord {
        fid,
        fname,
        addresses,
        followers,
        profile_url,
    })
}

/// Read the user list from any reader; bad lines are logged and skipped
pub fn load_users_from<R: Read>(reader: R) -> Result<UserListReadResult> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut result = UserListReadResult::default();
    for (line, record) in rdr.records().enumerate() {
        let line_num = line + 2;
        let parsed = record
            .map_err(anyhow::Error::from)
            .and_then(|r| parse_user(&r, &columns));
        match parsed {
            Ok(user) => result.users.push(user),
            Err(e) => {
                warn!(line = line_num, error = %e, "Skipping malformed user row");
                result.malformed_rows += 1;
            }
        }
    }

    Ok(result)
}

/// Read the user list from disk; a missing file is an error
pub fn load_users<P: AsRef<Path>>(path: P) -> Result<UserListReadResult> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open user list {}", path.display()))?;
    load_users_from(file)
}
