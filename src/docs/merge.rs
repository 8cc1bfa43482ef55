use tracing::{debug, info};

use super::types::Collection;

/// Merge collections in priority order. The first collection to contain a
/// URL wins; later duplicates are discarded without looking at their content.
pub fn merge<'a, I>(collections: I) -> Collection
where
    I: IntoIterator<Item = (&'a str, Collection)>,
{
    let mut merged = Collection::new();

    for (name, docs) in collections {
        let offered = docs.len();
        let mut added = 0usize;
        for (url, doc) in docs {
            if merged.contains_key(&url) {
                debug!(url = %url, source = name, "duplicate document discarded");
                continue;
            }
            merged.insert(url, doc);
            added += 1;
        }
        info!(
            source = name,
            offered,
            added,
            duplicates = offered - added,
            "collection merged"
        );
    }

    merged
}
