//! Confidence Scorer
//!
//! Turns a `Resolution` plus the parser's fuzzy corrections into a score in
//! [0, 1] and a review decision.
//!
//! **Policy:**
//! - Start at 1.0
//! - Subtract `tie_break_penalty` per variant in `excluded_by_priority`
//! - Subtract `fuzzy_token_penalty` per fuzzy-corrected token that ended up in
//!   `matched_tokens`
//! - Clamp to [0, 1]
//!
//! **Review:** below `review_threshold`, or any tie decided by id order alone.

use crate::models::{ReviewReason, ScoredResolution};
use crate::parser::FuzzyCorrection;
use crate::resolver::Resolution;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Scoring configuration (`[scoring]` section)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_tie_break_penalty")]
    pub tie_break_penalty: f32,
    #[serde(default = "default_fuzzy_token_penalty")]
    pub fuzzy_token_penalty: f32,
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tie_break_penalty: default_tie_break_penalty(),
            fuzzy_token_penalty: default_fuzzy_token_penalty(),
            review_threshold: default_review_threshold(),
        }
    }
}

fn default_tie_break_penalty() -> f32 {
    0.15
}

fn default_fuzzy_token_penalty() -> f32 {
    0.10
}

fn default_review_threshold() -> f32 {
    0.60
}

/// Confidence Scorer
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    /// Per excluded tie candidate (default 0.15)
    tie_break_penalty: f32,

    /// Per fuzzy-corrected matched token (default 0.10)
    fuzzy_token_penalty: f32,

    /// Below this the result needs review (default 0.60)
    review_threshold: f32,
}

impl ConfidenceScorer {
    /// Scorer with default penalties and threshold
    pub fn new() -> Self {
        Self::from_config(&ScoringConfig::default())
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            tie_break_penalty: config.tie_break_penalty,
            fuzzy_token_penalty: config.fuzzy_token_penalty,
            review_threshold: config.review_threshold,
        }
    }

    pub fn review_threshold(&self) -> f32 {
        self.review_threshold
    }

    /// Score a resolution
    ///
    /// # Arguments
    /// * `resolution` - Resolver output
    /// * `corrections` - Fuzzy corrections the parser applied to the hints
    pub fn score(&self, resolution: &Resolution, corrections: &[FuzzyCorrection]) -> ScoredResolution {
        // Two listing typos corrected to the same term count once
        let fuzzy_matched: BTreeSet<&str> = corrections
            .iter()
            .map(|c| c.canonical.as_str())
            .filter(|canonical| resolution.matched_tokens.contains(*canonical))
            .collect();

        let raw = 1.0
            - self.tie_break_penalty * resolution.excluded_by_priority.len() as f32
            - self.fuzzy_token_penalty * fuzzy_matched.len() as f32;
        let confidence = raw.clamp(0.0, 1.0);
        let needs_review = confidence < self.review_threshold || resolution.decided_by_id_order;

        debug!(
            variant_id = %resolution.variant_id,
            confidence,
            excluded = resolution.excluded_by_priority.len(),
            fuzzy = fuzzy_matched.len(),
            needs_review,
            "Scored resolution"
        );

        ScoredResolution {
            variant_id: resolution.variant_id.clone(),
            mint_mark: resolution.mint_mark.clone(),
            confidence,
            needs_review,
            matched_tokens: resolution.matched_tokens.clone(),
            excluded_by_priority: resolution.excluded_by_priority.clone(),
            decided_by_id_order: resolution.decided_by_id_order,
        }
    }

    /// Why a scored resolution needs review; `None` if it does not
    ///
    /// An id-order tie outranks low confidence as the reported reason.
    pub fn review_reason(&self, scored: &ScoredResolution) -> Option<ReviewReason> {
        if scored.decided_by_id_order {
            let mut tied = vec![scored.variant_id.clone()];
            tied.extend(scored.excluded_by_priority.iter().cloned());
            return Some(ReviewReason::PriorityTie { tied });
        }
        if scored.confidence < self.review_threshold {
            return Some(ReviewReason::LowConfidence {
                confidence: scored.confidence,
                threshold: self.review_threshold,
            });
        }
        None
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new()
    }
}
