//! Token normalization shared by catalog keywords and listing text
//!
//! Both sides go through the same tokenizer so that a catalog keyword like
//! `"8/7"` and listing text like `"8/7 overdate"` produce comparable tokens.
//! A catalog keyword stays a phrase: it only matches when every one of its
//! tokens is present, so a stray grade number like the `8` in `VG-8` never
//! matches `"8/7"`.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

/// Words that carry no variety information in listing titles
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "of", "with", "for", "in", "on", "at", "by", "to", "from",
        "coin", "coins", "us", "usa", "u", "mint", "mintmark", "variety", "var", "rare", "nice",
        "lot", "see", "pics", "photos", "look", "free", "shipping",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Split text into lower-case alphanumeric tokens, keeping stop words
///
/// Any non-alphanumeric character is a separator, so `"1918-D"` yields
/// `["1918", "d"]` and `"8/7"` yields `["8", "7"]`.
pub fn raw_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tokenize and drop stop words
pub fn tokenize(text: &str) -> Vec<String> {
    raw_tokens(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

pub fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Tokenized catalog keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPhrase {
    tokens: BTreeSet<String>,
}

impl KeywordPhrase {
    pub fn new(keyword: &str) -> Option<Self> {
        let tokens: BTreeSet<String> = tokenize(keyword).into_iter().collect();
        (!tokens.is_empty()).then_some(Self { tokens })
    }

    pub fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }

    /// A lone number (`"3"`) reads the same as a grade or a lot size
    pub fn is_lone_number(&self) -> bool {
        self.tokens.len() == 1 && self.tokens.iter().all(|t| is_numeric_token(t))
    }

    /// Every token of the phrase appears in `hints`
    pub fn matches(&self, hints: &BTreeSet<String>) -> bool {
        !self.is_lone_number() && self.tokens.is_subset(hints)
    }
}

/// Tokenize each catalog keyword into a phrase, dropping empty ones
pub fn keyword_phrases<'a, I>(keywords: I) -> Vec<KeywordPhrase>
where
    I: IntoIterator<Item = &'a String>,
{
    keywords
        .into_iter()
        .filter_map(|k| KeywordPhrase::new(k))
        .collect()
}

/// Tokens of every phrase in `phrases` that fully matches `hints`
pub fn matched_tokens(phrases: &[KeywordPhrase], hints: &BTreeSet<String>) -> BTreeSet<String> {
    phrases
        .iter()
        .filter(|phrase| phrase.matches(hints))
        .flat_map(|phrase| phrase.tokens.iter().cloned())
        .collect()
}

/// Normalize a catalog keyword set into the token set used for matching
pub fn normalize_keywords<'a, I>(keywords: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    keywords.into_iter().flat_map(|k| tokenize(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_splits_tokens() {
        assert_eq!(raw_tokens("1918-D 8/7"), vec!["1918", "d", "8", "7"]);
        assert_eq!(raw_tokens("  Buffalo,Nickel!! "), vec!["buffalo", "nickel"]);
    }

    #[test]
    fn test_stop_words_removed() {
        assert_eq!(
            tokenize("The Buffalo Nickel coin with overdate"),
            vec!["buffalo", "nickel", "overdate"]
        );
    }

    #[test]
    fn test_keywords_normalized_like_listing_text() {
        let keywords: BTreeSet<String> =
            ["Overdate".to_string(), "8/7".to_string(), "the".to_string()].into();
        let normalized = normalize_keywords(&keywords);
        let expected: BTreeSet<String> =
            ["7", "8", "overdate"].iter().map(|s| s.to_string()).collect();
        assert_eq!(normalized, expected);
    }

    fn hints(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_phrase_needs_every_token() {
        let phrases = keyword_phrases(&["overdate".to_string(), "8/7".to_string()]);
        assert_eq!(phrases.len(), 2);

        assert!(matched_tokens(&phrases, &hints(&["buffalo", "vg", "8"])).is_empty());
        assert!(matched_tokens(&phrases, &hints(&["f", "7", "pcgs"])).is_empty());
        assert_eq!(
            matched_tokens(&phrases, &hints(&["8", "7", "buffalo"])),
            hints(&["7", "8"])
        );
        assert_eq!(
            matched_tokens(&phrases, &hints(&["overdate", "8"])),
            hints(&["overdate"])
        );
    }

    #[test]
    fn test_lone_number_keyword_never_matches() {
        let phrase = KeywordPhrase::new("3").unwrap();
        assert!(phrase.is_lone_number());
        assert!(!phrase.matches(&hints(&["3", "legs"])));
        assert!(KeywordPhrase::new("the").is_none());
        assert!(!KeywordPhrase::new("3 legs").unwrap().is_lone_number());
    }
}
