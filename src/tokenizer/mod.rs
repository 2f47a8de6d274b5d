//! Word and trigram tokenization strategies.
//!
//! Both strategies are exposed as free functions keyed on [`Mode`](crate::config::Mode)
//! rather than as a boxed trait object, since only one mode is ever active for the
//! lifetime of a generation and the index actor always knows which one at construction
//! time.

use std::collections::HashSet;

use crate::config::Mode;

/// Tokenize a whole file's content into a deduplicated set of tokens, as the indexer
/// pool does for every `CREATE`/`MODIFY` event.
#[must_use]
pub fn tokenize_content(mode: Mode, content: &str) -> HashSet<String> {
    match mode {
        Mode::Word => word_tokens(content).collect(),
        Mode::Trigram => content.lines().flat_map(trigrams_of_line).collect(),
    }
}

/// Tokenize a query string into an ordered list of tokens, for word mode.
///
/// Unlike [`tokenize_content`], order is preserved and duplicates are not removed,
/// since the word-mode query algorithm treats the first and last tokens specially.
#[must_use]
pub fn tokenize_word_query(query: &str) -> Vec<String> {
    word_tokens(query).collect()
}

/// Tokenize a query string into its trigrams, in order, for trigram mode.
///
/// Callers are expected to only call this once `query.len() >= 3`; shorter queries
/// are handled as a substring search over the reverse index's keys instead.
#[must_use]
pub fn trigrams_of_query(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();

    if chars.len() < 3 {
        return Vec::new();
    }

    chars
        .windows(3)
        .map(|window| window.iter().collect())
        .collect()
}

/// Whether a line matches a query under the configured mode's matching predicate.
///
/// Both modes use a plain case-insensitive substring match for verification: the tokenization strategies differ only in how *candidates* are generated,
/// never in how a line is finally confirmed to contain the query.
#[must_use]
pub fn line_matches(_mode: Mode, line: &str, query: &str) -> bool {
    line.to_lowercase().contains(&query.to_lowercase())
}

fn word_tokens(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|run| !run.is_empty())
        .map(str::to_lowercase)
}

fn trigrams_of_line(line: &str) -> Vec<String> {
    let mut lowered: Vec<char> = line.to_lowercase().chars().collect();

    while lowered.len() < 3 {
        lowered.push(' ');
    }

    lowered
        .windows(3)
        .map(|window| window.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_word_tokenize_lowercases_and_splits_on_punctuation() {
        let tokens = tokenize_content(Mode::Word, "Hello, World! foo_bar 123");

        assert!(tokens.contains("hello"));
        assert!(tokens.contains("world"));
        // `_` is not alphanumeric, so `foo_bar` splits into two tokens.
        assert!(tokens.contains("foo"));
        assert!(tokens.contains("bar"));
        assert!(tokens.contains("123"));
    }

    #[test]
    fn test_word_tokenize_dedups_repeated_words() {
        let tokens = tokenize_content(Mode::Word, "foo foo foo");

        assert_eq!(tokens.len(), 1);
    }

    #[rstest]
    #[case("abcdef", &["abc", "bcd", "cde", "def"])]
    #[case("ab", &["ab "])]
    #[case("a", &["a  "])]
    #[case("", &["   "])]
    fn test_trigram_tokenize_pads_short_lines(#[case] line: &str, #[case] expected: &[&str]) {
        let tokens = tokenize_content(Mode::Trigram, line);

        for expected_token in expected {
            assert!(
                tokens.contains(*expected_token),
                "expected {tokens:?} to contain {expected_token:?}"
            );
        }
    }

    #[test]
    fn test_trigrams_of_query_requires_at_least_three_chars() {
        assert!(trigrams_of_query("ab").is_empty());
        assert_eq!(trigrams_of_query("abcd"), vec!["abc", "bcd"]);
    }

    #[test]
    fn test_line_matches_is_case_insensitive_substring() {
        assert!(line_matches(Mode::Word, "Hello World", "hello"));
        assert!(!line_matches(Mode::Word, "Hello World", "xyz"));
    }
}
