//! Hierarchy Validator
//!
//! Enforces the structural invariants of a variant snapshot before the store
//! accepts it. Violations are rejected, never repaired.
//!
//! # Checks
//! 1. **Identity**: ids are non-empty and unique
//! 2. **Parent links**: every parent id exists; a child sits exactly one level
//!    below its parent and shares its (series, year, mint) group; a parentless
//!    node is level 1; a declared `is_base_variant` flag matches the computed one
//! 3. **Reachability**: a bounded depth-first walk from every parentless node
//!    must reach every record within 4 levels. Unreached records are members of
//!    a cycle or hang below a missing parent.
//! 4. **Group completeness**: every group has at least one base variant
//!
//! All violations are collected and reported in a deterministic order.

use crate::error::{ResolveError, Result};
use crate::models::{GroupKey, ResolutionLevel, Variant, VariantId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Maximum number of levels in a family tree
pub const MAX_DEPTH: usize = ResolutionLevel::MAX as usize;

/// Kind of structural problem found in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ViolationKind {
    EmptyId,
    DuplicateId,
    MissingParent,
    RootLevel,
    LevelMismatch,
    GroupMismatch,
    BaseFlagMismatch,
    Unreachable,
    DepthExceeded,
    NoBaseVariant,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::EmptyId => "empty id",
            ViolationKind::DuplicateId => "duplicate id",
            ViolationKind::MissingParent => "missing parent",
            ViolationKind::RootLevel => "parentless non-base level",
            ViolationKind::LevelMismatch => "level mismatch",
            ViolationKind::GroupMismatch => "group mismatch",
            ViolationKind::BaseFlagMismatch => "base flag mismatch",
            ViolationKind::Unreachable => "unreachable from any root",
            ViolationKind::DepthExceeded => "depth exceeded",
            ViolationKind::NoBaseVariant => "group without base variant",
        }
    }
}

/// A single invariant violation tied to the offending record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HierarchyViolation {
    pub kind: ViolationKind,
    pub variant_id: VariantId,
    pub detail: String,
}

impl fmt::Display for HierarchyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}': {}", self.kind.as_str(), self.variant_id, self.detail)
    }
}

/// Hierarchy Validator
///
/// Stateless; deterministic and side-effect-free apart from logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyValidator;

impl HierarchyValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a full candidate snapshot
    ///
    /// # Errors
    /// `ResolveError::InvalidHierarchy` listing every violation and the ids of
    /// the offending records.
    pub fn validate(&self, records: &[Variant]) -> Result<()> {
        let violations = self.collect_violations(records);

        if violations.is_empty() {
            debug!(records = records.len(), "Variant snapshot passed validation");
            return Ok(());
        }

        let offending_ids: Vec<VariantId> = violations
            .iter()
            .map(|v| v.variant_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let reason = format!(
            "{} violation(s); first: {}",
            violations.len(),
            violations[0]
        );

        warn!(
            records = records.len(),
            violations = violations.len(),
            first = %violations[0],
            "Rejected variant snapshot"
        );

        Err(ResolveError::InvalidHierarchy {
            reason,
            offending_ids,
            violations,
        })
    }

    /// Collect every violation, sorted by kind then id
    pub fn collect_violations(&self, records: &[Variant]) -> Vec<HierarchyViolation> {
        let mut violations = Vec::new();

        // Check 1: Identity
        let mut by_id: HashMap<&VariantId, &Variant> = HashMap::with_capacity(records.len());
        for record in records {
            if record.variant_id.is_empty() {
                violations.push(violation(
                    ViolationKind::EmptyId,
                    &record.variant_id,
                    format!("record in group {} has a blank id", record.group_key()),
                ));
                continue;
            }
            if by_id.insert(&record.variant_id, record).is_some() {
                violations.push(violation(
                    ViolationKind::DuplicateId,
                    &record.variant_id,
                    "id appears more than once".to_string(),
                ));
            }
        }

        // Check 2: Parent links, building the parent -> children index
        let mut children: HashMap<&VariantId, Vec<&Variant>> = HashMap::new();
        let mut roots: Vec<&Variant> = Vec::new();
        let mut missing_parent: HashSet<&VariantId> = HashSet::new();

        for &record in by_id.values() {
            match &record.parent_variant_id {
                None => {
                    if record.resolution_level != ResolutionLevel::Base {
                        violations.push(violation(
                            ViolationKind::RootLevel,
                            &record.variant_id,
                            format!(
                                "no parent but resolution_level is {}",
                                record.resolution_level
                            ),
                        ));
                    }
                    roots.push(record);
                }
                Some(parent_id) => match by_id.get(parent_id) {
                    None => {
                        missing_parent.insert(&record.variant_id);
                        violations.push(violation(
                            ViolationKind::MissingParent,
                            &record.variant_id,
                            format!("parent '{}' does not exist", parent_id),
                        ));
                    }
                    Some(parent) => {
                        if parent.resolution_level.child() != Some(record.resolution_level) {
                            violations.push(violation(
                                ViolationKind::LevelMismatch,
                                &record.variant_id,
                                format!(
                                    "level {} under parent '{}' at level {}",
                                    record.resolution_level.as_u8(),
                                    parent_id,
                                    parent.resolution_level.as_u8()
                                ),
                            ));
                        }
                        if parent.group_key() != record.group_key() {
                            violations.push(violation(
                                ViolationKind::GroupMismatch,
                                &record.variant_id,
                                format!(
                                    "group {} differs from parent '{}' group {}",
                                    record.group_key(),
                                    parent_id,
                                    parent.group_key()
                                ),
                            ));
                        }
                        children.entry(parent_id).or_default().push(record);
                    }
                },
            }

            if let Some(declared) = record.declared_base {
                if declared != record.is_base_variant() {
                    violations.push(violation(
                        ViolationKind::BaseFlagMismatch,
                        &record.variant_id,
                        format!(
                            "is_base_variant declared {} but computed {}",
                            declared,
                            record.is_base_variant()
                        ),
                    ));
                }
            }
        }

        // Check 3: Bounded walk from every root
        let mut reached: HashSet<&VariantId> = HashSet::with_capacity(by_id.len());
        let mut stack: Vec<(&Variant, usize)> = roots.iter().map(|r| (*r, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            if !reached.insert(&node.variant_id) {
                continue;
            }
            if depth > MAX_DEPTH {
                violations.push(violation(
                    ViolationKind::DepthExceeded,
                    &node.variant_id,
                    format!("found at depth {} (max {})", depth, MAX_DEPTH),
                ));
                continue;
            }
            if let Some(kids) = children.get(&node.variant_id) {
                stack.extend(kids.iter().map(|kid| (*kid, depth + 1)));
            }
        }

        for &record in by_id.values() {
            if reached.contains(&record.variant_id) || missing_parent.contains(&record.variant_id)
            {
                continue;
            }
            violations.push(violation(
                ViolationKind::Unreachable,
                &record.variant_id,
                describe_detached(record, &by_id),
            ));
        }

        // Check 4: Every group has a base variant
        let mut groups: BTreeMap<GroupKey, (bool, BTreeSet<&VariantId>)> = BTreeMap::new();
        for &record in by_id.values() {
            let entry = groups.entry(record.group_key()).or_default();
            entry.0 |= record.is_base_variant();
            entry.1.insert(&record.variant_id);
        }
        for (key, (has_base, members)) in &groups {
            if *has_base {
                continue;
            }
            if let Some(first) = members.iter().next() {
                violations.push(violation(
                    ViolationKind::NoBaseVariant,
                    first,
                    format!("group {} has {} member(s) and no base", key, members.len()),
                ));
            }
        }

        violations.sort();
        violations.dedup();
        violations
    }
}

fn violation(kind: ViolationKind, id: &VariantId, detail: String) -> HierarchyViolation {
    HierarchyViolation {
        kind,
        variant_id: id.clone(),
        detail,
    }
}

/// Explain why a record was not reached: a parent cycle or a missing ancestor
fn describe_detached<'a>(record: &'a Variant, by_id: &HashMap<&'a VariantId, &'a Variant>) -> String {
    let mut seen: HashSet<&VariantId> = HashSet::new();
    let mut current = record;
    seen.insert(&current.variant_id);

    // Bounded by the record count: every step either visits a new id or stops
    while let Some(parent_id) = &current.parent_variant_id {
        match by_id.get(parent_id) {
            None => return format!("ancestor '{}' does not exist", parent_id),
            Some(&parent) => {
                if !seen.insert(&parent.variant_id) {
                    return format!("parent chain loops back to '{}'", parent_id);
                }
                current = parent;
            }
        }
    }
    "not connected to any root".to_string()
}
