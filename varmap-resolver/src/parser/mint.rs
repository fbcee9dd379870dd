//! Mint mark extraction
//!
//! Two sources, tried in order:
//! 1. A mint letter attached to the year (`1918-D`, `1918 D`, `1918D`, `1918/7-D`)
//! 2. City names and abbreviations anywhere in the listing

use super::FuzzyMatcher;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::debug;

/// Mint letter right after the year, optionally after an overdate suffix
static MINT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:/\d{1,2})?[\s\-]*(cc|[pdsow])(?:[^a-z0-9]|$)")
        .expect("mint suffix pattern is valid")
});

/// Two-word city names, checked before single words
const MINT_BIGRAMS: &[(&str, &str, &str)] = &[
    ("carson", "city", "CC"),
    ("new", "orleans", "O"),
    ("san", "francisco", "S"),
    ("west", "point", "W"),
];

/// Single-word aliases, sorted by alias for deterministic fuzzy matching
const MINT_ALIASES: &[(&str, &str)] = &[
    ("carsoncity", "CC"),
    ("cc", "CC"),
    ("denver", "D"),
    ("frisco", "S"),
    ("neworleans", "O"),
    ("nola", "O"),
    ("phil", "P"),
    ("phila", "P"),
    ("philadelphia", "P"),
    ("philly", "P"),
    ("sanfrancisco", "S"),
    ("sf", "S"),
    ("westpoint", "W"),
];

/// Mint letter directly following the year
///
/// `after_year` is the listing text starting right after the year digits.
/// Returns the byte range of the letter(s) within `after_year` and the
/// canonical mint mark.
pub(super) fn mint_after_year(after_year: &str) -> Option<(Range<usize>, String)> {
    let letter = MINT_SUFFIX.captures(after_year)?.get(1)?;
    Some((letter.range(), letter.as_str().to_uppercase()))
}

/// A mint alias found in the token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct AliasMatch {
    pub mint: String,
    /// Index of the first consumed token
    pub start: usize,
    /// Number of consumed tokens
    pub len: usize,
}

/// Scan tokens for a city name or abbreviation
///
/// Exact bigrams and words win over fuzzy matches anywhere in the listing.
/// Tokens that are catalog keywords are never fuzzy-matched to an alias.
pub(super) fn mint_from_aliases(
    tokens: &[String],
    matcher: &FuzzyMatcher,
    vocabulary: &BTreeSet<String>,
) -> Option<AliasMatch> {
    for (i, pair) in tokens.windows(2).enumerate() {
        if let Some((_, _, mint)) = MINT_BIGRAMS
            .iter()
            .find(|(first, second, _)| pair[0] == *first && pair[1] == *second)
        {
            return Some(AliasMatch {
                mint: mint.to_string(),
                start: i,
                len: 2,
            });
        }
    }

    for (i, token) in tokens.iter().enumerate() {
        if let Some((_, mint)) = MINT_ALIASES.iter().find(|(alias, _)| token.as_str() == *alias) {
            return Some(AliasMatch {
                mint: mint.to_string(),
                start: i,
                len: 1,
            });
        }
    }

    for (i, token) in tokens.iter().enumerate() {
        if vocabulary.contains(token) {
            continue;
        }
        let aliases = MINT_ALIASES.iter().map(|(alias, _)| *alias);
        if let Some((alias, edits)) = matcher.closest(token, aliases) {
            let mint = MINT_ALIASES
                .iter()
                .find(|(a, _)| *a == alias)
                .map(|(_, m)| m.to_string())?;
            debug!(observed = %token, alias, edits, "Fuzzy mint alias match");
            return Some(AliasMatch {
                mint,
                start: i,
                len: 1,
            });
        }
    }

    None
}
