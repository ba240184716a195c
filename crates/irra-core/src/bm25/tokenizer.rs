//! Keyword tokenization.
//!
//! Lowercase, then split on Unicode whitespace. No stemming, no stopword
//! removal, no punctuation stripping: "cell." and "cell" are different terms.

/// Tokenize text for indexing and querying.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits() {
        assert_eq!(
            tokenize("  Mitochondria  is the\tPOWERHOUSE\n"),
            vec!["mitochondria", "is", "the", "powerhouse"]
        );
    }

    #[test]
    fn test_keeps_punctuation_and_stopwords() {
        assert_eq!(tokenize("The cell."), vec!["the", "cell."]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n ").is_empty());
    }
}
