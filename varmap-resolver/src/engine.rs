//! Resolution Engine
//!
//! Wires the listing parser, resolver and confidence scorer together against
//! the store's current snapshot. Each call takes one snapshot handle up front
//! and uses it throughout, so a concurrent `load()` never splits a call across
//! two catalog versions.

use crate::config::{EngineConfig, UnknownMintPolicy};
use crate::error::{ResolveError, Result};
use crate::models::{HierarchySnapshotReport, ResolutionOutcome, ReviewReason, ScoredResolution, VariantId};
use crate::parser::{FuzzyCorrection, ListingParser, ParserConfig};
use crate::resolver::{ResolutionQuery, Resolver};
use crate::scorer::ConfidenceScorer;
use crate::store::{Snapshot, VariantStore};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Resolution Engine
pub struct ResolutionEngine {
    store: Arc<VariantStore>,
    resolver: Resolver,
    scorer: ConfidenceScorer,
    parser_config: ParserConfig,
    unknown_mint_policy: UnknownMintPolicy,
}

impl ResolutionEngine {
    /// Engine with default scoring, parsing and mint policy
    pub fn new(store: Arc<VariantStore>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    pub fn with_config(store: Arc<VariantStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            resolver: Resolver::new(),
            scorer: ConfidenceScorer::from_config(&config.scoring),
            parser_config: config.parser.clone(),
            unknown_mint_policy: config.resolution.unknown_mint_policy,
        }
    }

    pub fn store(&self) -> &Arc<VariantStore> {
        &self.store
    }

    /// Resolve a structured query
    pub fn resolve(&self, query: &ResolutionQuery) -> ResolutionOutcome {
        let snapshot = self.store.snapshot();
        match self.score_query(&snapshot, query, &[]) {
            Ok(scored) => self.classify(scored),
            Err(e) => ResolutionOutcome::Failed(e),
        }
    }

    /// Parse a listing title and resolve it within `series_id`
    pub fn resolve_listing(&self, series_id: &str, listing: &str) -> ResolutionOutcome {
        let snapshot = self.store.snapshot();
        let parser = ListingParser::new(snapshot.keyword_vocabulary(), self.parser_config.clone());
        let hints = parser.parse(listing);
        debug!(
            series_id,
            year = ?hints.year,
            mint = ?hints.mint,
            tokens = hints.tokens.len(),
            corrections = hints.corrections.len(),
            "Parsed listing"
        );

        let Some(year) = hints.year else {
            return ResolutionOutcome::Failed(incomplete("year", listing));
        };

        match hints.mint {
            Some(mint) => {
                let query = ResolutionQuery::new(series_id, year, &mint).with_tokens(hints.tokens);
                match self.score_query(&snapshot, &query, &hints.corrections) {
                    Ok(scored) => self.classify(scored),
                    Err(e) => ResolutionOutcome::Failed(e),
                }
            }
            None => match self.unknown_mint_policy {
                UnknownMintPolicy::Refuse => ResolutionOutcome::Failed(incomplete("mint", listing)),
                UnknownMintPolicy::SearchAllMints => {
                    let query = ResolutionQuery::new(series_id, year, "").with_tokens(hints.tokens);
                    self.search_all_mints(&snapshot, query, &hints.corrections)
                }
            },
        }
    }

    /// Family report for a variant
    pub fn family(&self, variant_id: &VariantId) -> Result<HierarchySnapshotReport> {
        self.store.report(variant_id)
    }

    fn score_query(
        &self,
        snapshot: &Snapshot,
        query: &ResolutionQuery,
        corrections: &[FuzzyCorrection],
    ) -> Result<ScoredResolution> {
        let resolution = self.resolver.resolve(snapshot, query)?;
        Ok(self.scorer.score(&resolution, corrections))
    }

    fn classify(&self, scored: ScoredResolution) -> ResolutionOutcome {
        match self.scorer.review_reason(&scored) {
            None => ResolutionOutcome::Resolved(scored),
            Some(reason) => ResolutionOutcome::NeedsReview {
                preferred: Some(scored.variant_id.clone()),
                alternatives: scored.excluded_by_priority.clone(),
                candidates: vec![scored],
                reason,
            },
        }
    }

    /// Resolve in every mint group that has variants for the year
    fn search_all_mints(
        &self,
        snapshot: &Snapshot,
        query: ResolutionQuery,
        corrections: &[FuzzyCorrection],
    ) -> ResolutionOutcome {
        let mints = snapshot.mints_for(&query.series_id, query.year);
        if mints.is_empty() {
            return ResolutionOutcome::Failed(ResolveError::NoCandidates {
                series_id: query.series_id,
                year: query.year,
                mint_mark: "*".to_string(),
            });
        }

        let mut candidates = Vec::new();
        let mut first_error = None;
        for mint in &mints {
            let per_mint = ResolutionQuery {
                mint_mark: mint.clone(),
                ..query.clone()
            };
            match self.score_query(snapshot, &per_mint, corrections) {
                Ok(scored) => candidates.push(scored),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match candidates.len() {
            0 => ResolutionOutcome::Failed(first_error.unwrap_or(ResolveError::NoCandidates {
                series_id: query.series_id,
                year: query.year,
                mint_mark: "*".to_string(),
            })),
            1 if mints.len() == 1 => {
                let scored = candidates.remove(0);
                self.classify(scored)
            }
            _ => {
                candidates.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.mint_mark.cmp(&b.mint_mark))
                });
                debug!(
                    series_id = %query.series_id,
                    year = query.year,
                    mints = mints.len(),
                    "Mint not stated, several mint groups match"
                );
                ResolutionOutcome::NeedsReview {
                    preferred: None,
                    alternatives: candidates.iter().map(|c| c.variant_id.clone()).collect(),
                    candidates,
                    reason: ReviewReason::AmbiguousMint {
                        mints: mints.into_iter().collect(),
                    },
                }
            }
        }
    }
}

fn incomplete(missing: &str, listing: &str) -> ResolveError {
    ResolveError::IncompleteListing {
        missing: missing.to_string(),
        text: listing.to_string(),
    }
}
