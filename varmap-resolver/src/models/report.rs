//! Read-only views of a snapshot for display tools

use super::variant::{ResolutionLevel, Variant, VariantId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Compact description of a variant inside a family report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSummary {
    pub variant_id: VariantId,
    pub level: ResolutionLevel,
    pub parent_variant_id: Option<VariantId>,
    pub description: String,
}

impl From<&Variant> for VariantSummary {
    fn from(variant: &Variant) -> Self {
        Self {
            variant_id: variant.variant_id.clone(),
            level: variant.resolution_level,
            parent_variant_id: variant.parent_variant_id.clone(),
            description: variant.description.clone(),
        }
    }
}

/// Full family of one variant: ancestors nearest-first, descendants breadth-first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySnapshotReport {
    pub variant_id: VariantId,
    pub level: ResolutionLevel,
    pub ancestors: Vec<VariantSummary>,
    pub descendants: Vec<VariantSummary>,
    pub snapshot_version: u64,
}

/// Summary of a loaded snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub version: u64,
    pub label: Option<String>,
    pub variant_count: usize,
    pub group_count: usize,
    pub loaded_at: DateTime<Utc>,
}
