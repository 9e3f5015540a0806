/// Splits a line into words on runs of Unicode whitespace. Words keep their
/// case and punctuation; empty tokens never come out.
pub fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace()
}

/// Map step: every word of the line paired with a count of one.
pub fn map_line(line: &str) -> impl Iterator<Item = (&str, u64)> {
    tokenize(line).map(|word| (word, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_line() {
        let words: Vec<&str> = tokenize("the quick fox").collect();
        assert_eq!(words, vec!["the", "quick", "fox"]);
    }

    #[test]
    fn test_tokenize_collapses_whitespace_runs() {
        let words: Vec<&str> = tokenize("  a\t\tb   c \r").collect();
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tokenize_whitespace_only_line() {
        assert_eq!(tokenize("").count(), 0);
        assert_eq!(tokenize(" \t  ").count(), 0);
    }

    #[test]
    fn test_tokenize_unicode_whitespace() {
        // no-break space and ideographic space
        let words: Vec<&str> = tokenize("naïve\u{00A0}café\u{3000}東京").collect();
        assert_eq!(words, vec!["naïve", "café", "東京"]);
    }

    #[test]
    fn test_tokenize_keeps_case_and_punctuation() {
        let words: Vec<&str> = tokenize("The the, THE").collect();
        assert_eq!(words, vec!["The", "the,", "THE"]);
    }

    #[test]
    fn test_map_line_emits_ones() {
        let pairs: Vec<(&str, u64)> = map_line("to be or not to be").collect();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|(_, count)| *count == 1));
        assert_eq!(pairs[4], ("to", 1));
    }
}
