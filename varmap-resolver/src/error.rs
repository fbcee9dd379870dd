//! Error types for varmap-resolver
//!
//! None of these are retried automatically. Every variant carries the
//! identifiers or text a maintainer needs to act on it.

use crate::models::VariantId;
use crate::validator::HierarchyViolation;
use thiserror::Error;

/// Resolver error type
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Snapshot rejected by the hierarchy validator; the previous snapshot stays active
    #[error("Invalid hierarchy: {reason} (offending ids: {})", join_ids(.offending_ids))]
    InvalidHierarchy {
        reason: String,
        offending_ids: Vec<VariantId>,
        violations: Vec<HierarchyViolation>,
    },

    /// Lookup of a nonexistent variant id
    #[error("Variant not found: {variant_id}")]
    NotFound { variant_id: VariantId },

    /// Query coordinates match nothing in the catalog
    #[error("No catalog variants for {series_id} {year}-{mint_mark}")]
    NoCandidates {
        series_id: String,
        year: i32,
        mint_mark: String,
    },

    /// Group exists but has no base variant (catalog completeness bug)
    #[error(
        "No base variant for {series_id} {year}-{mint_mark} (group members: {})",
        join_ids(.variant_ids)
    )]
    NoBaseVariant {
        series_id: String,
        year: i32,
        mint_mark: String,
        variant_ids: Vec<VariantId>,
    },

    /// Listing text lacks a coordinate needed for group lookup
    #[error("Listing is missing {missing}: {text:?}")]
    IncompleteListing { missing: String, text: String },

    /// Catalog file could not be read or decoded
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// varmap-common error
    #[error("Common error: {0}")]
    Common(#[from] varmap_common::Error),
}

impl ResolveError {
    /// Short machine-readable code for result records
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidHierarchy { .. } => "INVALID_HIERARCHY",
            ResolveError::NotFound { .. } => "NOT_FOUND",
            ResolveError::NoCandidates { .. } => "NO_CANDIDATES",
            ResolveError::NoBaseVariant { .. } => "NO_BASE_VARIANT",
            ResolveError::IncompleteListing { .. } => "INCOMPLETE_LISTING",
            ResolveError::Catalog(_) => "CATALOG_ERROR",
            ResolveError::Common(_) => "COMMON_ERROR",
        }
    }
}

fn join_ids(ids: &[VariantId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter().map(VariantId::as_str).collect::<Vec<_>>().join(", ")
}

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, ResolveError>;
