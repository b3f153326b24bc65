// Route suggestions for 404 responses

use strsim::levenshtein;

const MAX_SUGGESTIONS: usize = 3;

/// Registered static paths closest to `path` by edit distance.
///
/// A candidate qualifies when its distance is at most a third of the
/// longer string's length, with a floor of 2. Results are ordered by
/// distance, then alphabetically.
pub fn suggest<'a>(path: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|candidate| *candidate != path)
        .filter_map(|candidate| {
            let distance = levenshtein(path, candidate);
            let limit = (path.len().max(candidate.len()) / 3).max(2);
            (distance <= limit).then_some((distance, candidate))
        })
        .collect();

    scored.sort_unstable();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_typo() {
        assert_eq!(suggest("/user", ["/users", "/health"]), vec!["/users"]);
    }

    #[test]
    fn test_far_paths_ignored() {
        assert!(suggest("/x", ["/completely/different"]).is_empty());
    }

    #[test]
    fn test_ordering_and_limit() {
        let found = suggest("/item", ["/items", "/itemz", "/iter", "/items2", "/it"]);
        assert_eq!(found.len(), MAX_SUGGESTIONS);
        assert_eq!(found[0], "/items");
    }
}
