//! Fuzzy matching of collection names.

use strsim::levenshtein;

/// Maximum Levenshtein distance to consider a name as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Finds the closest candidate to `query`, ignoring case.
///
/// Returns `None` for an exact match or when nothing is within
/// [`MAX_SUGGESTION_DISTANCE`].
pub(crate) fn find_similar_name<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| (name, levenshtein(&query_lower, &name.to_lowercase())))
        .min_by_key(|(_, d)| *d)?;

    if best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE {
        Some(best_match.to_string())
    } else {
        None
    }
}
