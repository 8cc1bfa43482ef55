pub mod score;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::docs::types::IndicatorSet;

// Syntactic only: 999.999.999.999 is a valid match.
static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("ipv4 pattern"));
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("url pattern"));
// MD5, SHA1 and SHA256 shaped runs.
static HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-fA-F0-9]{32,64}\b").expect("hash pattern"));

fn find_all(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract IPv4 addresses, URLs and hashes from `text`.
///
/// Each pattern scans the whole text independently, so a hash inside a URL
/// is reported under both. Duplicates are kept in match order.
pub fn extract(text: &str) -> IndicatorSet {
    if text.is_empty() {
        return IndicatorSet::default();
    }

    IndicatorSet {
        ipv4: find_all(&IPV4, text),
        url: find_all(&URL, text),
        hash: find_all(&HASH, text),
    }
}
