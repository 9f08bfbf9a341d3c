//! FAQ corpus loading
//!
//! Newline-delimited quoted CSV: `"question","answer"` per line, with a naive
//! comma split as fallback. Unparseable lines are dropped. A missing or
//! unreachable source is an empty corpus, never an error.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::FaqEntry;

lazy_static! {
    static ref QUOTED_LINE: Regex =
        Regex::new(r#"^"(.+?)","(.+)"$"#).expect("quoted csv pattern must compile");
}

/// Parse CSV text into entries, silently skipping lines that fit neither form
pub fn parse_csv(csv: &str) -> Vec<FaqEntry> {
    csv.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<FaqEntry> {
    if let Some(caps) = QUOTED_LINE.captures(line) {
        return Some(FaqEntry {
            q: caps[1].to_string(),
            a: caps[2].to_string(),
        });
    }

    let parts: Vec<&str> = line.split(',').map(strip_quotes).collect();
    if parts.len() < 2 {
        return None;
    }

    Some(FaqEntry {
        q: parts[0].to_string(),
        a: parts[1..].join(","),
    })
}

fn strip_quotes(field: &str) -> &str {
    let field = field.strip_prefix('"').unwrap_or(field);
    field.strip_suffix('"').unwrap_or(field)
}

/// Load a corpus from a filesystem path or an `http(s)://` URL
pub async fn load_corpus(source: &str) -> Vec<FaqEntry> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_remote(source).await
    } else {
        match tokio::fs::read_to_string(source).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(source, error = %e, "FAQ corpus unavailable, continuing with empty corpus");
                None
            }
        }
    };

    let entries = text.as_deref().map(parse_csv).unwrap_or_default();
    info!(source, entries = entries.len(), "FAQ corpus loaded");
    entries
}

async fn fetch_remote(url: &str) -> Option<String> {
    let response = match reqwest::get(url).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url, error = %e, "FAQ corpus fetch failed");
            return None;
        }
    };

    if !response.status().is_success() {
        warn!(url, status = %response.status(), "FAQ corpus fetch returned non-success");
        return None;
    }

    match response.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(url, error = %e, "FAQ corpus body unreadable");
            None
        }
    }
}
