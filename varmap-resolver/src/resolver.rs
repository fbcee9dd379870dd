//! Resolver
//!
//! Picks the single most specific variant for `(series_id, year, mint_mark)`
//! plus optional hint tokens.
//!
//! **States:**
//! 1. `AwaitingGroup` - fetch the group; empty group fails with `NoCandidates`
//! 2. `ExactMatchAttempt` - whole-keyword matches across every level of the group
//! 3. `BaseFallback` - rank the group's base variants by priority
//!
//! **Ranking (keyword phase):** highest `resolution_level`, then most
//! overlapping tokens, then priority tie-break.
//!
//! **Priority tie-break:** higher `priority_score`, then ascending
//! `variant_id`. Iteration order never decides, so repeated calls agree.

use crate::error::{ResolveError, Result};
use crate::models::{normalize_mint, Variant, VariantId};
use crate::store::Snapshot;
use crate::text;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Structured resolution query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionQuery {
    pub series_id: String,
    pub year: i32,
    pub mint_mark: String,
    /// Normalized hint tokens (see `with_hints`)
    pub hint_tokens: BTreeSet<String>,
}

impl ResolutionQuery {
    pub fn new(series_id: &str, year: i32, mint_mark: &str) -> Self {
        Self {
            series_id: series_id.trim().to_string(),
            year,
            mint_mark: normalize_mint(mint_mark),
            hint_tokens: BTreeSet::new(),
        }
    }

    /// Add hints, normalized with the listing tokenizer ("8/7" -> "8", "7")
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for hint in hints {
            self.hint_tokens.extend(text::tokenize(hint.as_ref()));
        }
        self
    }

    /// Add tokens that are already normalized
    pub fn with_tokens(mut self, tokens: BTreeSet<String>) -> Self {
        self.hint_tokens.extend(tokens);
        self
    }
}

/// Phase of the state machine that produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    KeywordMatch,
    BaseFallback,
}

/// Resolver output, before confidence scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub variant_id: VariantId,
    pub mint_mark: String,
    pub phase: MatchPhase,
    /// Hint tokens found in the chosen variant's keywords
    pub matched_tokens: BTreeSet<String>,
    /// Members of the tied set that lost only on the priority tie-break
    pub excluded_by_priority: Vec<VariantId>,
    /// Winner's priority equalled the runner-up's; id order decided
    pub decided_by_id_order: bool,
}

enum ResolverState<'s> {
    AwaitingGroup,
    ExactMatchAttempt(Vec<&'s Variant>),
    BaseFallback(Vec<&'s Variant>),
    Resolved(Resolution),
    Failed(ResolveError),
}

impl ResolverState<'_> {
    fn name(&self) -> &'static str {
        match self {
            ResolverState::AwaitingGroup => "awaiting_group",
            ResolverState::ExactMatchAttempt(_) => "exact_match_attempt",
            ResolverState::BaseFallback(_) => "base_fallback",
            ResolverState::Resolved(_) => "resolved",
            ResolverState::Failed(_) => "failed",
        }
    }
}

/// Outcome of the priority tie-break over one candidate set
struct PriorityRanking<'s> {
    winner: &'s Variant,
    excluded: Vec<VariantId>,
    decided_by_id_order: bool,
}

/// Stateless resolver over one snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a query against one snapshot
    ///
    /// # Errors
    /// `NoCandidates` if the group is empty, `NoBaseVariant` if the keyword
    /// phase finds nothing and the group has no base variant.
    pub fn resolve(&self, snapshot: &Snapshot, query: &ResolutionQuery) -> Result<Resolution> {
        let mut state = ResolverState::AwaitingGroup;

        loop {
            let next = match state {
                ResolverState::AwaitingGroup => {
                    let group = snapshot.group(&query.series_id, query.year, &query.mint_mark);
                    if group.is_empty() {
                        ResolverState::Failed(ResolveError::NoCandidates {
                            series_id: query.series_id.clone(),
                            year: query.year,
                            mint_mark: query.mint_mark.clone(),
                        })
                    } else if query.hint_tokens.is_empty() {
                        ResolverState::BaseFallback(group)
                    } else {
                        ResolverState::ExactMatchAttempt(group)
                    }
                }
                ResolverState::ExactMatchAttempt(group) => {
                    match self.keyword_match(snapshot, &group, query) {
                        Some(resolution) => ResolverState::Resolved(resolution),
                        None => ResolverState::BaseFallback(group),
                    }
                }
                ResolverState::BaseFallback(group) => match self.base_fallback(snapshot, &group, query) {
                    Ok(resolution) => ResolverState::Resolved(resolution),
                    Err(e) => ResolverState::Failed(e),
                },
                ResolverState::Resolved(resolution) => {
                    debug!(
                        variant_id = %resolution.variant_id,
                        phase = ?resolution.phase,
                        matched = resolution.matched_tokens.len(),
                        excluded = resolution.excluded_by_priority.len(),
                        "Resolved variant"
                    );
                    return Ok(resolution);
                }
                ResolverState::Failed(e) => {
                    debug!(code = e.code(), "Resolution failed: {}", e);
                    return Err(e);
                }
            };
            trace!(
                series_id = %query.series_id,
                year = query.year,
                mint_mark = %query.mint_mark,
                state = next.name(),
                "Resolver transition"
            );
            state = next;
        }
    }

    /// Keyword overlap across all levels of the group
    fn keyword_match(
        &self,
        snapshot: &Snapshot,
        group: &[&Variant],
        query: &ResolutionQuery,
    ) -> Option<Resolution> {
        let scored: Vec<(&Variant, BTreeSet<String>)> = group
            .iter()
            .map(|&variant| {
                let overlap = snapshot.matched_keywords(&variant.variant_id, &query.hint_tokens);
                (variant, overlap)
            })
            .filter(|(_, overlap)| !overlap.is_empty())
            .collect();

        let best_level = scored.iter().map(|(v, _)| v.resolution_level).max()?;
        let at_level: Vec<&(&Variant, BTreeSet<String>)> = scored
            .iter()
            .filter(|(v, _)| v.resolution_level == best_level)
            .collect();
        let best_overlap = at_level.iter().map(|(_, o)| o.len()).max()?;
        let tied: Vec<&Variant> = at_level
            .iter()
            .filter(|(_, o)| o.len() == best_overlap)
            .map(|(v, _)| *v)
            .collect();

        let ranking = rank_by_priority(tied)?;
        let matched_tokens = scored
            .iter()
            .find(|(v, _)| v.variant_id == ranking.winner.variant_id)
            .map(|(_, o)| o.clone())
            .unwrap_or_default();

        Some(Resolution {
            variant_id: ranking.winner.variant_id.clone(),
            mint_mark: normalize_mint(&ranking.winner.mint_mark),
            phase: MatchPhase::KeywordMatch,
            matched_tokens,
            excluded_by_priority: ranking.excluded,
            decided_by_id_order: ranking.decided_by_id_order,
        })
    }

    fn base_fallback(
        &self,
        snapshot: &Snapshot,
        group: &[&Variant],
        query: &ResolutionQuery,
    ) -> Result<Resolution> {
        let bases: Vec<&Variant> = group
            .iter()
            .copied()
            .filter(|v| v.is_base_variant())
            .collect();

        let Some(ranking) = rank_by_priority(bases) else {
            return Err(ResolveError::NoBaseVariant {
                series_id: query.series_id.clone(),
                year: query.year,
                mint_mark: query.mint_mark.clone(),
                variant_ids: group.iter().map(|v| v.variant_id.clone()).collect(),
            });
        };

        let matched_tokens = snapshot.matched_keywords(&ranking.winner.variant_id, &query.hint_tokens);

        Ok(Resolution {
            variant_id: ranking.winner.variant_id.clone(),
            mint_mark: normalize_mint(&ranking.winner.mint_mark),
            phase: MatchPhase::BaseFallback,
            matched_tokens,
            excluded_by_priority: ranking.excluded,
            decided_by_id_order: ranking.decided_by_id_order,
        })
    }
}

/// Higher priority first, then ascending id; `None` for an empty set
fn rank_by_priority(mut candidates: Vec<&Variant>) -> Option<PriorityRanking<'_>> {
    candidates.sort_by(|a, b| {
        (Reverse(a.priority_score), &a.variant_id).cmp(&(Reverse(b.priority_score), &b.variant_id))
    });

    let winner = *candidates.first()?;
    let decided_by_id_order = candidates
        .get(1)
        .map(|runner_up| runner_up.priority_score == winner.priority_score)
        .unwrap_or(false);
    let excluded = candidates[1..]
        .iter()
        .map(|v| v.variant_id.clone())
        .collect();

    Some(PriorityRanking {
        winner,
        excluded,
        decided_by_id_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(records: Vec<Variant>) -> Snapshot {
        Snapshot::build(records, None).unwrap()
    }

    fn overdate_family() -> Vec<Variant> {
        let base = Variant::base("bn-1918-d", "buffalo_nickel", 1918, "D")
            .with_keywords(["buffalo", "nickel"]);
        let overdate = Variant::child_of(&base, "bn-1918-d-8over7")
            .unwrap()
            .with_keywords(["overdate", "8/7"]);
        let doubled = Variant::child_of(&overdate, "bn-1918-d-8over7-ddo")
            .unwrap()
            .with_keywords(["doubled", "obverse"]);
        vec![base, overdate, doubled]
    }

    #[test]
    fn test_empty_group_is_no_candidates() {
        let snapshot = snapshot(overdate_family());
        let err = Resolver::new()
            .resolve(&snapshot, &ResolutionQuery::new("buffalo_nickel", 1950, "D"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoCandidates { year: 1950, .. }));
    }

    #[test]
    fn test_single_base_without_hints() {
        let snapshot = snapshot(overdate_family());
        let resolution = Resolver::new()
            .resolve(&snapshot, &ResolutionQuery::new("buffalo_nickel", 1918, "d"))
            .unwrap();
        assert_eq!(resolution.variant_id.as_str(), "bn-1918-d");
        assert_eq!(resolution.phase, MatchPhase::BaseFallback);
        assert!(resolution.excluded_by_priority.is_empty());
        assert!(!resolution.decided_by_id_order);
    }

    #[test]
    fn test_overdate_hints_select_child() {
        let snapshot = snapshot(overdate_family());
        let query = ResolutionQuery::new("buffalo_nickel", 1918, "D").with_hints(["8", "7", "overdate"]);
        let resolution = Resolver::new().resolve(&snapshot, &query).unwrap();
        assert_eq!(resolution.variant_id.as_str(), "bn-1918-d-8over7");
        assert_eq!(resolution.phase, MatchPhase::KeywordMatch);
        assert_eq!(resolution.matched_tokens.len(), 3);
    }

    #[test]
    fn test_deeper_level_beats_larger_overlap() {
        let snapshot = snapshot(overdate_family());
        let query = ResolutionQuery::new("buffalo_nickel", 1918, "D")
            .with_hints(["buffalo", "nickel", "doubled"]);
        let resolution = Resolver::new().resolve(&snapshot, &query).unwrap();
        assert_eq!(resolution.variant_id.as_str(), "bn-1918-d-8over7-ddo");
    }

    #[test]
    fn test_unmatched_hints_fall_back_to_base() {
        let snapshot = snapshot(overdate_family());
        let query = ResolutionQuery::new("buffalo_nickel", 1918, "D").with_hints(["proof"]);
        let resolution = Resolver::new().resolve(&snapshot, &query).unwrap();
        assert_eq!(resolution.variant_id.as_str(), "bn-1918-d");
        assert_eq!(resolution.phase, MatchPhase::BaseFallback);
        assert!(resolution.matched_tokens.is_empty());
    }

    #[test]
    fn test_partial_numeric_keyword_falls_back_to_base() {
        let snapshot = snapshot(overdate_family());
        let query = ResolutionQuery::new("buffalo_nickel", 1918, "D").with_hints(["vg", "8"]);
        let resolution = Resolver::new().resolve(&snapshot, &query).unwrap();
        assert_eq!(resolution.variant_id.as_str(), "bn-1918-d");
        assert_eq!(resolution.phase, MatchPhase::BaseFallback);
        assert!(resolution.matched_tokens.is_empty());
    }

    #[test]
    fn test_priority_then_id_order() {
        let snapshot = snapshot(vec![
            Variant::base("b", "lincoln_cent", 1909, "S").with_priority(10),
            Variant::base("a", "lincoln_cent", 1909, "S").with_priority(10),
            Variant::base("c", "lincoln_cent", 1909, "S").with_priority(5),
        ]);
        let query = ResolutionQuery::new("lincoln_cent", 1909, "S");
        let first = Resolver::new().resolve(&snapshot, &query).unwrap();
        let second = Resolver::new().resolve(&snapshot, &query).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.variant_id.as_str(), "a");
        assert!(first.decided_by_id_order);
        assert_eq!(
            first.excluded_by_priority,
            vec![VariantId::new("b"), VariantId::new("c")]
        );
    }

    #[test]
    fn test_keyword_tie_uses_priority() {
        let base = Variant::base("lc-1955-p", "lincoln_cent", 1955, "P");
        let ddo_1 = Variant::child_of(&base, "lc-1955-p-ddo-1")
            .unwrap()
            .with_priority(1)
            .with_keywords(["doubled", "die"]);
        let ddo_2 = Variant::child_of(&base, "lc-1955-p-ddo-2")
            .unwrap()
            .with_priority(9)
            .with_keywords(["doubled", "die"]);
        let snapshot = snapshot(vec![base, ddo_1, ddo_2]);

        let query = ResolutionQuery::new("lincoln_cent", 1955, "P").with_hints(["doubled die"]);
        let resolution = Resolver::new().resolve(&snapshot, &query).unwrap();
        assert_eq!(resolution.variant_id.as_str(), "lc-1955-p-ddo-2");
        assert_eq!(resolution.excluded_by_priority, vec![VariantId::new("lc-1955-p-ddo-1")]);
        assert!(!resolution.decided_by_id_order);
    }

    #[test]
    fn test_hints_are_normalized() {
        let query = ResolutionQuery::new(" buffalo_nickel ", 1918, "d").with_hints(["8/7", "The Overdate"]);
        let expected: BTreeSet<String> = ["7", "8", "overdate"].iter().map(|s| s.to_string()).collect();
        assert_eq!(query.hint_tokens, expected);
        assert_eq!(query.series_id, "buffalo_nickel");
        assert_eq!(query.mint_mark, "D");
    }
}
