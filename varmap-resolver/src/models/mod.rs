//! Data model: variant records, snapshot reports and resolution results

pub mod outcome;
pub mod report;
pub mod variant;

pub use outcome::{ResolutionOutcome, ResolutionResult, ReviewReason, ScoredResolution};
pub use report::{HierarchySnapshotReport, SnapshotInfo, VariantSummary};
pub use variant::{normalize_mint, GroupKey, ResolutionLevel, Variant, VariantId};
