// src/utils.rs

use chrono::Duration;
use eyre::{eyre, Result};
use regex::Regex;
use std::collections::HashMap;

/// Parse a string like "30s", "5m" or "1h" into a chrono::Duration.
/// Returns an error if the format is unsupported.
pub fn parse_timeout(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (num, unit_secs) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else {
        return Err(eyre!("Unsupported timeout format '{}'; expected '<n>s', '<n>m' or '<n>h'", s));
    };
    let value: i64 = num.parse().map_err(|e| eyre!("Invalid timeout '{}': {}", s, e))?;
    if value < 0 {
        return Err(eyre!("Timeout '{}' must not be negative", s));
    }
    Ok(Duration::seconds(value * unit_secs))
}

/// Extract Gmail Thread ID (X-GM-THRID) from one raw FETCH response line.
///
/// Gmail provides X-GM-THRID as an IMAP extension attribute (not a header),
/// and the imap crate's response parser rejects it, so it is read from the
/// raw response text instead.
///
/// Example response: "* 1 FETCH (X-GM-THRID 1852322999435237597 UID 7)"
pub fn extract_gmail_thread_id(raw_fetch: &str) -> Option<String> {
    extract_gmail_extension(raw_fetch, "X-GM-THRID")
}

/// Map UID to X-GM-THRID over a raw `UID FETCH <set> (X-GM-THRID)` response.
/// Lines without both attributes are ignored.
pub fn parse_gmail_thread_ids(raw: &str) -> HashMap<u32, String> {
    let uid_re = match Regex::new(r"\bUID\s+(\d+)") {
        Ok(re) => re,
        Err(_) => return HashMap::new(),
    };
    raw.lines()
        .filter(|line| line.starts_with('*') && line.contains("FETCH"))
        .filter_map(|line| {
            let uid = uid_re.captures(line)?.get(1)?.as_str().parse().ok()?;
            Some((uid, extract_gmail_thread_id(line)?))
        })
        .collect()
}

/// Helper to extract a Gmail extension field value from raw FETCH output.
/// The value is expected to be a numeric ID following the field name.
fn extract_gmail_extension(raw: &str, field: &str) -> Option<String> {
    let pattern = format!(r"{}\s+(\d+)", regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
