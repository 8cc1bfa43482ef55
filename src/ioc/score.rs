use crate::docs::types::IndicatorSet;

const IPV4_WEIGHT: usize = 2;
const URL_WEIGHT: usize = 3;
const HASH_WEIGHT: usize = 1;
pub const MAX_SCORE: u8 = 10;

/// Weighted indicator count, clamped to `MAX_SCORE`.
pub fn score(iocs: &IndicatorSet) -> u8 {
    let raw = iocs.ipv4.len() * IPV4_WEIGHT
        + iocs.url.len() * URL_WEIGHT
        + iocs.hash.len() * HASH_WEIGHT;
    raw.min(MAX_SCORE as usize) as u8
}
