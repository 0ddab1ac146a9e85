use crate::ledger::Category;
use regex::Regex;
use std::sync::LazyLock;

/// Integer-or-decimal numeral. No currency symbols, locales, or negatives.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("amount pattern is valid"));

/// Ordered keyword table; the first keyword found in the utterance wins.
/// Matching is case-insensitive substring containment, not tokenized, so a
/// keyword embedded inside a longer word still matches.
const CATEGORY_KEYWORDS: &[(&str, Category)] = &[
    ("sabzi", Category::Vegetables),
    ("vegetable", Category::Vegetables),
    ("groceries", Category::Groceries),
    ("store", Category::Groceries),
    ("food", Category::Food),
    ("transport", Category::Transport),
    ("rent", Category::Rent),
    ("utilities", Category::Utilities),
];

/// First numeral substring of the utterance as a number, or `None` when the
/// utterance contains no numeral. Utterances with several numbers silently
/// take the first one, quantities included.
pub fn extract_amount(text: &str) -> Option<f64> {
    AMOUNT_RE
        .find(text)
        .and_then(|found| found.as_str().parse().ok())
}

pub fn extract_category(text: &str) -> Category {
    let lowered = text.to_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if lowered.contains(keyword) {
            return *category;
        }
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_first_numeral() {
        assert_eq!(extract_amount("10 Rs for Sabzi"), Some(10.0));
        assert_eq!(extract_amount("spent 12.50 on food"), Some(12.5));
        assert_eq!(extract_amount("2 kilos for 80 rupees"), Some(2.0));
    }

    #[test]
    fn no_numeral_yields_none() {
        assert_eq!(extract_amount("no numbers here"), None);
        assert_eq!(extract_amount(""), None);
    }

    #[test]
    fn numeral_embedded_in_words_still_matches() {
        assert_eq!(extract_amount("rent:1500paid"), Some(1500.0));
    }

    #[test]
    fn keyword_maps_to_category() {
        assert_eq!(extract_category("10 Rs for Sabzi"), Category::Vegetables);
        assert_eq!(extract_category("picked up VEGETABLES"), Category::Vegetables);
        assert_eq!(extract_category("groceries run"), Category::Groceries);
        assert_eq!(extract_category("bus transport home"), Category::Transport);
        assert_eq!(extract_category("paid the rent"), Category::Rent);
    }

    #[test]
    fn first_keyword_in_table_order_wins() {
        // Both "sabzi" and "store" appear; the table lists sabzi first.
        assert_eq!(
            extract_category("sabzi from the store"),
            Category::Vegetables
        );
    }

    #[test]
    fn substring_matching_is_not_tokenized() {
        // "rent" inside "parenting" still matches, by design of the heuristic.
        assert_eq!(extract_category("parenting book"), Category::Rent);
    }

    #[test]
    fn unmatched_text_defaults_to_other() {
        assert_eq!(extract_category("something else entirely"), Category::Other);
    }
}
