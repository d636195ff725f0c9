//! Domain extraction from list-file text.
//!
//! List files are loosely formatted: one entry per line, `#` and `//`
//! comments, and entries that may carry a scheme, a `www.` prefix, a path,
//! a port or a trailing comment. Everything is reduced to a bare, lowercase
//! hostname and deduplicated.

use crate::types::Domain;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    /// One or more labels followed by an alphabetic top-level label.
    static ref HOSTNAME_PATTERN: Regex =
        Regex::new(r"^(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$").unwrap();
}

/// Extract the ordered, deduplicated set of domains from list-file text.
///
/// Lines that are empty or start with `#` or `//` are skipped. For every
/// other line an optional `http://`/`https://` scheme and an optional `www.`
/// label are removed, then the entry is cut at the first `#`, `/` and `:` in
/// that order. Entries that do not look like a hostname are dropped.
///
/// Returns an empty vector when nothing matches; deciding how to report
/// "nothing to check" is up to the caller.
///
/// # Example
///
/// ```rust
/// use reach_check_lib::extract_domains;
///
/// let domains = extract_domains("# comment\n\nexample.com\nhttps://www.Example.ORG/path\n");
/// let names: Vec<&str> = domains.iter().map(|d| d.as_str()).collect();
/// assert_eq!(names, vec!["example.com", "example.org"]);
/// ```
pub fn extract_domains(text: &str) -> Vec<Domain> {
    let mut seen = HashSet::new();
    let mut domains = Vec::new();

    for line in text.lines() {
        let Some(candidate) = strip_entry(line) else {
            continue;
        };

        if let Some(domain) = Domain::parse(candidate) {
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
    }

    domains
}

/// Reduce one raw line to its hostname candidate, or `None` for blank and
/// comment lines.
fn strip_entry(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
        return None;
    }

    let mut entry = strip_prefix_ignore_case(trimmed, "https://")
        .or_else(|| strip_prefix_ignore_case(trimmed, "http://"))
        .unwrap_or(trimmed);
    entry = strip_prefix_ignore_case(entry, "www.").unwrap_or(entry);

    let entry = entry.split('#').next().unwrap_or("").trim();
    let entry = entry.split('/').next().unwrap_or("");
    let entry = entry.split(':').next().unwrap_or("").trim();

    if entry.is_empty() {
        None
    } else {
        Some(entry)
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

/// Check a candidate against the minimal hostname shape.
pub(crate) fn is_valid_hostname(candidate: &str) -> bool {
    candidate.len() <= 253 && HOSTNAME_PATTERN.is_match(candidate)
}

/// Whether a file name denotes a domain list.
///
/// Lists are named `*.list`, and rotated or variant copies carry a suffix
/// after it (`hosts.list-opt`, `auto.list-backup`).
pub fn is_list_file(filename: &str) -> bool {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    name.ends_with(".list") || name.contains(".list-")
}
