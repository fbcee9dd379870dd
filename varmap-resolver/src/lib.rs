//! varmap-resolver library - Variant Hierarchy & Resolution Engine
//!
//! Resolves loosely worded listing titles ("1918-D 8/7 overdate Buffalo
//! Nickel") to one variant in a hierarchical catalog.
//!
//! # Components
//! - `store` - validated, immutable catalog snapshots with atomic swap
//! - `validator` - structural invariants checked before a snapshot is accepted
//! - `resolver` - group lookup, keyword match, priority tie-break
//! - `parser` - year, mint and keyword extraction from free text
//! - `scorer` - confidence and review decision
//! - `engine` - facade tying the above together
//! - `catalog`, `reload` - JSON catalog files and hot-reload

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod parser;
pub mod reload;
pub mod resolver;
pub mod scorer;
pub mod store;
pub mod text;
pub mod validator;

pub use catalog::{load_catalog_file, parse_catalog, read_catalog, CatalogFile};
pub use config::{EngineConfig, UnknownMintPolicy};
pub use engine::ResolutionEngine;
pub use error::{ResolveError, Result};
pub use models::{
    GroupKey, HierarchySnapshotReport, ResolutionLevel, ResolutionOutcome, ResolutionResult,
    ReviewReason, ScoredResolution, SnapshotInfo, Variant, VariantId,
};
pub use parser::{FuzzyCorrection, ListingHints, ListingParser, ParserConfig};
pub use reload::{ReloadStatus, SnapshotWatcher};
pub use resolver::{MatchPhase, Resolution, ResolutionQuery, Resolver};
pub use scorer::{ConfidenceScorer, ScoringConfig};
pub use store::{Snapshot, VariantStore};
pub use validator::{HierarchyValidator, HierarchyViolation, ViolationKind};
