use crate::ledger::LedgerEntry;
use similar::TextDiff;

/// Lowercase, strip everything that is not a word character (alphanumeric
/// or underscore) or whitespace, then collapse whitespace runs to single
/// spaces.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch.is_whitespace() {
            for lowered in ch.to_lowercase() {
                cleaned.push(lowered);
            }
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character-sequence similarity ratio in [0, 1] between the normalized
/// forms of two utterances (difflib-style matching-blocks ratio).
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

#[derive(Debug)]
pub struct DuplicateMatch<'a> {
    pub score: f32,
    pub entry: &'a LedgerEntry,
}

/// Scores `text` against each candidate's stored description and returns the
/// single best match when its score exceeds `threshold`. Candidates are
/// expected to be pre-filtered to the trailing duplicate window.
pub fn find_duplicate<'a>(
    text: &str,
    candidates: &'a [LedgerEntry],
    threshold: f32,
) -> Option<DuplicateMatch<'a>> {
    let normalized = normalize(text);

    let mut best: Option<DuplicateMatch<'a>> = None;
    for entry in candidates {
        let candidate = normalize(&entry.description);
        let score = TextDiff::from_chars(normalized.as_str(), candidate.as_str()).ratio();
        if best.as_ref().map_or(true, |found| score > found.score) {
            best = Some(DuplicateMatch { score, entry });
        }
    }

    best.filter(|found| found.score > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Category;
    use time::macros::datetime;

    fn entry(description: &str) -> LedgerEntry {
        LedgerEntry::new(
            datetime!(2024-03-07 18:00:00),
            Category::Other,
            10.0,
            description.to_string(),
        )
    }

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize("10 Rs,  for   SABZI!"), "10 rs for sabzi");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn normalization_keeps_underscores() {
        // Underscores count as word characters, same as the punctuation
        // filter this heuristic mirrors.
        assert_eq!(normalize("cache_key: 40!"), "cache_key 40");
        assert!((similarity("cache_key 40", "cache_key, 40") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn identical_normalized_text_scores_one() {
        assert!((similarity("10 Rs for Sabzi", "10 rs, for sabzi!") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn disjoint_text_scores_near_zero() {
        assert!(similarity("qqqq wwww", "zzzz xxxx") < 0.2);
    }

    #[test]
    fn exact_match_is_flagged() {
        let candidates = vec![entry("completely different thing"), entry("10 Rs for Sabzi")];
        let found = find_duplicate("10 rs for sabzi", &candidates, 0.7).expect("flagged");
        assert!((found.score - 1.0).abs() < f32::EPSILON);
        assert_eq!(found.entry.description, "10 Rs for Sabzi");
    }

    #[test]
    fn below_threshold_is_not_flagged() {
        let candidates = vec![entry("monthly rent payment")];
        assert!(find_duplicate("qq ww ee", &candidates, 0.7).is_none());
    }

    #[test]
    fn highest_scoring_candidate_is_selected() {
        let candidates = vec![
            entry("20 rs for sabzi today"),
            entry("20 rs for sabzi"),
        ];
        let found = find_duplicate("20 rs for sabzi", &candidates, 0.7).expect("flagged");
        assert_eq!(found.entry.description, "20 rs for sabzi");
    }

    #[test]
    fn empty_candidate_list_never_flags() {
        assert!(find_duplicate("10 rs for sabzi", &[], 0.7).is_none());
    }
}
