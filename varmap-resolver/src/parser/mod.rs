//! Listing Parser
//!
//! Turns a free-text listing title into structured hints: year, mint mark and
//! normalized keyword tokens. Parsing never fails; anything it cannot find is
//! left as `None`.
//!
//! **Fuzzy tolerance:** a token missing from the catalog keyword vocabulary is
//! corrected to the closest vocabulary term by optimal-string-alignment
//! distance. Tokens shorter than 4 characters must match exactly.

mod mint;

use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::debug;

/// Shortest token eligible for fuzzy correction
pub const MIN_FUZZY_LEN: usize = 4;

/// Tokens at least this long use `max_edits_long`
pub const LONG_TOKEN_LEN: usize = 8;

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"));

/// Parser configuration (`[parser]` section)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
    /// Edits allowed for tokens of 4-7 characters
    #[serde(default = "default_max_edits_short")]
    pub max_edits_short: usize,
    /// Edits allowed for tokens of 8+ characters
    #[serde(default = "default_max_edits_long")]
    pub max_edits_long: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
            max_edits_short: default_max_edits_short(),
            max_edits_long: default_max_edits_long(),
        }
    }
}

fn default_min_year() -> i32 {
    1700
}

fn default_max_year() -> i32 {
    2100
}

fn default_max_edits_short() -> usize {
    1
}

fn default_max_edits_long() -> usize {
    2
}

/// A listing token replaced by a vocabulary term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuzzyCorrection {
    pub observed: String,
    pub canonical: String,
    pub edits: usize,
}

/// Structured hints extracted from one listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingHints {
    pub year: Option<i32>,
    /// Upper-case mint mark
    pub mint: Option<String>,
    /// Normalized tokens, fuzzy corrections applied
    pub tokens: BTreeSet<String>,
    pub corrections: Vec<FuzzyCorrection>,
}

/// Edit-distance matcher shared by keyword and mint alias correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    max_edits_short: usize,
    max_edits_long: usize,
}

impl FuzzyMatcher {
    pub fn new(max_edits_short: usize, max_edits_long: usize) -> Self {
        Self {
            max_edits_short,
            max_edits_long,
        }
    }

    /// Edit budget for a token; `None` below `MIN_FUZZY_LEN`
    pub fn max_edits(&self, token: &str) -> Option<usize> {
        match token.chars().count() {
            n if n < MIN_FUZZY_LEN => None,
            n if n < LONG_TOKEN_LEN => Some(self.max_edits_short),
            _ => Some(self.max_edits_long),
        }
    }

    /// Closest term within the edit budget
    ///
    /// Ties on distance go to the lexicographically smallest term, whatever
    /// order `terms` arrives in.
    pub fn closest<'a, I>(&self, token: &str, terms: I) -> Option<(&'a str, usize)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let budget = self.max_edits(token)?;
        let mut best: Option<(usize, &'a str)> = None;

        for term in terms {
            let edits = strsim::osa_distance(token, term);
            if edits > budget {
                continue;
            }
            if best.map_or(true, |current| (edits, term) < current) {
                best = Some((edits, term));
            }
        }

        best.map(|(edits, term)| (term, edits))
    }
}

/// Listing parser bound to one keyword vocabulary
pub struct ListingParser<'v> {
    vocabulary: &'v BTreeSet<String>,
    config: ParserConfig,
    matcher: FuzzyMatcher,
}

impl<'v> ListingParser<'v> {
    pub fn new(vocabulary: &'v BTreeSet<String>, config: ParserConfig) -> Self {
        let matcher = FuzzyMatcher::new(config.max_edits_short, config.max_edits_long);
        Self {
            vocabulary,
            config,
            matcher,
        }
    }

    /// Extract hints from a listing title
    pub fn parse(&self, listing: &str) -> ListingHints {
        // Consumed spans are blanked in place so byte offsets stay valid
        let mut remaining = listing.to_string();
        let mut hints = ListingHints::default();

        if let Some((year_range, year)) = self.find_year(listing) {
            hints.year = Some(year);
            if let Some((letter, mark)) = mint::mint_after_year(&listing[year_range.end..]) {
                blank(
                    &mut remaining,
                    year_range.end + letter.start..year_range.end + letter.end,
                );
                hints.mint = Some(mark);
            }
            blank(&mut remaining, year_range);
        }

        let mut raw = text::raw_tokens(&remaining);
        if hints.mint.is_none() {
            if let Some(found) = mint::mint_from_aliases(&raw, &self.matcher, self.vocabulary) {
                raw.drain(found.start..found.start + found.len);
                hints.mint = Some(found.mint);
            }
        }

        for token in raw.into_iter().filter(|t| !text::is_stop_word(t)) {
            if self.vocabulary.contains(&token) || token.chars().all(|c| c.is_ascii_digit()) {
                hints.tokens.insert(token);
                continue;
            }

            let vocabulary = self.vocabulary.iter().map(String::as_str);
            match self.matcher.closest(&token, vocabulary) {
                Some((canonical, edits)) => {
                    debug!(observed = %token, canonical, edits, "Fuzzy keyword correction");
                    hints.tokens.insert(canonical.to_string());
                    hints.corrections.push(FuzzyCorrection {
                        observed: token,
                        canonical: canonical.to_string(),
                        edits,
                    });
                }
                None => {
                    hints.tokens.insert(token);
                }
            }
        }

        hints
    }

    /// First standalone 4-digit run inside the configured year range
    fn find_year(&self, listing: &str) -> Option<(Range<usize>, i32)> {
        DIGIT_RUN
            .find_iter(listing)
            .filter(|m| m.as_str().len() == 4)
            .filter_map(|m| m.as_str().parse::<i32>().ok().map(|year| (m.range(), year)))
            .find(|(_, year)| (self.config.min_year..=self.config.max_year).contains(year))
    }
}

/// Overwrite an ASCII span with spaces, keeping byte offsets
fn blank(text: &mut String, range: Range<usize>) {
    let width = range.len();
    text.replace_range(range, &" ".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> BTreeSet<String> {
        ["7", "8", "buffalo", "doubled", "nickel", "obverse", "overdate", "type"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn parse(listing: &str) -> ListingHints {
        let vocabulary = vocabulary();
        ListingParser::new(&vocabulary, ParserConfig::default()).parse(listing)
    }

    #[test]
    fn test_overdate_listing() {
        let hints = parse("1918-D 8/7 overdate Buffalo Nickel");
        assert_eq!(hints.year, Some(1918));
        assert_eq!(hints.mint.as_deref(), Some("D"));
        assert!(hints.tokens.contains("overdate"));
        assert!(hints.tokens.contains("8"));
        assert!(hints.tokens.contains("7"));
        assert!(!hints.tokens.contains("1918"));
        assert!(!hints.tokens.contains("d"));
        assert!(hints.corrections.is_empty());
    }

    #[test]
    fn test_overdate_attached_to_year() {
        let hints = parse("1918/7-D Buffalo Nickel");
        assert_eq!(hints.year, Some(1918));
        assert_eq!(hints.mint.as_deref(), Some("D"));
        assert!(hints.tokens.contains("7"));
    }

    #[test]
    fn test_year_must_be_standalone_and_in_range() {
        assert_eq!(parse("Lot 123456 buffalo nickel 1937").year, Some(1937));
        assert_eq!(parse("9999 buffalo 1913").year, Some(1913));
        assert_eq!(parse("buffalo nickel").year, None);
    }

    #[test]
    fn test_mint_from_city_name() {
        let hints = parse("1913 Buffalo Nickel Type 1 Denver");
        assert_eq!(hints.mint.as_deref(), Some("D"));
        assert!(!hints.tokens.contains("denver"));

        let hints = parse("1879 Morgan Dollar Carson City");
        assert_eq!(hints.mint.as_deref(), Some("CC"));
        assert!(!hints.tokens.contains("carson"));
        assert!(!hints.tokens.contains("city"));
    }

    #[test]
    fn test_mint_city_typo() {
        assert_eq!(parse("1918 buffalo denvr").mint.as_deref(), Some("D"));
    }

    #[test]
    fn test_mint_absent() {
        let hints = parse("1913 Buffalo Nickel Type 1");
        assert_eq!(hints.year, Some(1913));
        assert_eq!(hints.mint, None);
    }

    #[test]
    fn test_one_edit_corrected() {
        let hints = parse("1918-D ovedate buffalo");
        assert!(hints.tokens.contains("overdate"));
        assert_eq!(
            hints.corrections,
            vec![FuzzyCorrection {
                observed: "ovedate".to_string(),
                canonical: "overdate".to_string(),
                edits: 1,
            }]
        );
    }

    #[test]
    fn test_long_token_allows_two_edits() {
        let hints = parse("1955 dubbled obvrse");
        // "dubbled" is 7 chars (1 edit budget) and 2 edits away
        assert!(!hints.tokens.contains("doubled"));
        assert!(hints.tokens.contains("obverse"));

        let hints = parse("1918 ovrdatee buffalo");
        assert!(hints.tokens.contains("overdate"));
    }

    #[test]
    fn test_short_tokens_require_exact_match() {
        let hints = parse("1918 typ nikel");
        assert!(hints.tokens.contains("typ"));
        assert!(!hints.tokens.contains("type"));
        assert!(hints.tokens.contains("nickel"));
    }

    #[test]
    fn test_unrelated_tokens_kept_verbatim() {
        let hints = parse("1918-D pcgs ms63");
        assert!(hints.tokens.contains("pcgs"));
        assert!(hints.tokens.contains("ms63"));
        assert!(hints.corrections.is_empty());
    }

    #[test]
    fn test_closest_tie_goes_to_smallest_term() {
        let matcher = FuzzyMatcher::new(1, 2);
        let terms = ["cast", "bast", "fast"];
        assert_eq!(matcher.closest("past", terms), Some(("bast", 1)));
        assert_eq!(matcher.closest("pa", terms), None);
    }
}
