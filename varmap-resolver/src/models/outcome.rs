//! Resolution outcomes
//!
//! `ResolutionOutcome` is the tagged in-process result. `ResolutionResult` is
//! its flat, serializable form for downstream storage.

use super::variant::VariantId;
use crate::error::ResolveError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A resolved variant with its confidence evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResolution {
    pub variant_id: VariantId,
    pub mint_mark: String,
    pub confidence: f32,
    pub needs_review: bool,
    pub matched_tokens: BTreeSet<String>,
    /// Tied candidates that lost only on the priority tie-break
    pub excluded_by_priority: Vec<VariantId>,
    /// Winner had the same priority as the runner-up; id order decided
    pub decided_by_id_order: bool,
}

/// Why a resolution was routed to human review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewReason {
    /// Score fell below the review threshold
    LowConfidence { confidence: f32, threshold: f32 },
    /// Equal top priority; the winner was picked by id order
    PriorityTie { tied: Vec<VariantId> },
    /// Mint unknown and several mint groups matched the year
    AmbiguousMint { mints: Vec<String> },
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewReason::LowConfidence {
                confidence,
                threshold,
            } => write!(
                f,
                "confidence {:.2} below review threshold {:.2}",
                confidence, threshold
            ),
            ReviewReason::PriorityTie { tied } => write!(
                f,
                "equal top priority, id order picked first of {}",
                tied.iter()
                    .map(VariantId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ReviewReason::AmbiguousMint { mints } => {
                write!(f, "mint not stated; candidates in mints {}", mints.join(", "))
            }
        }
    }
}

/// Tagged result of one resolution call
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Confident, unambiguous resolution
    Resolved(ScoredResolution),
    /// Resolved or narrowed down, but a human must confirm
    NeedsReview {
        /// Engine's pick, if it has one
        preferred: Option<VariantId>,
        /// Scored candidates, best first
        candidates: Vec<ScoredResolution>,
        /// Other variants that were in contention
        alternatives: Vec<VariantId>,
        reason: ReviewReason,
    },
    /// No answer; the error names the offending input
    Failed(ResolveError),
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved(_))
    }

    pub fn needs_review(&self) -> bool {
        !self.is_resolved()
    }

    /// The chosen variant (resolved, or preferred under review)
    pub fn variant_id(&self) -> Option<&VariantId> {
        match self {
            ResolutionOutcome::Resolved(resolution) => Some(&resolution.variant_id),
            ResolutionOutcome::NeedsReview { preferred, .. } => preferred.as_ref(),
            ResolutionOutcome::Failed(_) => None,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            ResolutionOutcome::Resolved(resolution) => resolution.confidence,
            ResolutionOutcome::NeedsReview {
                preferred,
                candidates,
                ..
            } => match preferred {
                Some(_) => candidates.first().map(|c| c.confidence).unwrap_or(0.0),
                None => 0.0,
            },
            ResolutionOutcome::Failed(_) => 0.0,
        }
    }

    /// Flat record for downstream storage/reporting
    pub fn to_result(&self) -> ResolutionResult {
        match self {
            ResolutionOutcome::Resolved(resolution) => ResolutionResult {
                variant_id: Some(resolution.variant_id.clone()),
                confidence: resolution.confidence,
                needs_review: false,
                matched_tokens: resolution.matched_tokens.clone(),
                reason: None,
                error: None,
            },
            ResolutionOutcome::NeedsReview {
                preferred,
                candidates,
                reason,
                ..
            } => {
                let matched_tokens = match (preferred, candidates.first()) {
                    (Some(_), Some(best)) => best.matched_tokens.clone(),
                    _ => BTreeSet::new(),
                };
                ResolutionResult {
                    variant_id: preferred.clone(),
                    confidence: self.confidence(),
                    needs_review: true,
                    matched_tokens,
                    reason: Some(reason.to_string()),
                    error: None,
                }
            }
            ResolutionOutcome::Failed(err) => ResolutionResult {
                variant_id: None,
                confidence: 0.0,
                needs_review: true,
                matched_tokens: BTreeSet::new(),
                reason: None,
                error: Some(format!("{}: {}", err.code(), err)),
            },
        }
    }
}

/// Flat, serializable resolution record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub variant_id: Option<VariantId>,
    pub confidence: f32,
    pub needs_review: bool,
    pub matched_tokens: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
