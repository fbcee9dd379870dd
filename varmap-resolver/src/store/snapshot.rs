//! Immutable, validated catalog snapshot
//!
//! Records live in an arena keyed by `variant_id`. The parent -> children
//! index, the group index and the normalized keyword sets are built once when
//! the snapshot is created and never change afterwards.

use crate::error::{ResolveError, Result};
use crate::models::{
    GroupKey, HierarchySnapshotReport, SnapshotInfo, Variant, VariantId, VariantSummary,
};
use crate::text;
use crate::validator::{HierarchyValidator, MAX_DEPTH};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

static NO_TOKENS: BTreeSet<String> = BTreeSet::new();

/// One validated version of the full catalog
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    label: Option<String>,
    loaded_at: DateTime<Utc>,
    records: HashMap<VariantId, Variant>,
    children: HashMap<VariantId, Vec<VariantId>>,
    groups: BTreeMap<GroupKey, Vec<VariantId>>,
    keyword_tokens: HashMap<VariantId, BTreeSet<String>>,
    keyword_phrases: HashMap<VariantId, Vec<text::KeywordPhrase>>,
    vocabulary: BTreeSet<String>,
}

impl Snapshot {
    /// The snapshot a store starts with (version 0, no records)
    pub fn empty() -> Self {
        Self {
            version: 0,
            label: None,
            loaded_at: Utc::now(),
            records: HashMap::new(),
            children: HashMap::new(),
            groups: BTreeMap::new(),
            keyword_tokens: HashMap::new(),
            keyword_phrases: HashMap::new(),
            vocabulary: BTreeSet::new(),
        }
    }

    /// Validate records and build the indexes
    ///
    /// # Errors
    /// `ResolveError::InvalidHierarchy` if the validator rejects the records.
    pub fn build(records: Vec<Variant>, label: Option<String>) -> Result<Self> {
        HierarchyValidator::new().validate(&records)?;

        let mut snapshot = Self {
            label,
            ..Self::empty()
        };

        for record in records {
            let id = record.variant_id.clone();

            if let Some(parent_id) = &record.parent_variant_id {
                snapshot
                    .children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(id.clone());
            }
            snapshot
                .groups
                .entry(record.group_key())
                .or_default()
                .push(id.clone());

            let tokens = text::normalize_keywords(&record.keywords);
            snapshot.vocabulary.extend(tokens.iter().cloned());
            snapshot.keyword_tokens.insert(id.clone(), tokens);
            snapshot
                .keyword_phrases
                .insert(id.clone(), text::keyword_phrases(&record.keywords));
            snapshot.records.insert(id, record);
        }

        for ids in snapshot.children.values_mut() {
            ids.sort();
        }
        for ids in snapshot.groups.values_mut() {
            ids.sort();
        }

        Ok(snapshot)
    }

    pub(super) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            version: self.version,
            label: self.label.clone(),
            variant_count: self.records.len(),
            group_count: self.groups.len(),
            loaded_at: self.loaded_at,
        }
    }

    pub fn contains(&self, variant_id: &VariantId) -> bool {
        self.records.contains_key(variant_id)
    }

    /// Look up a record by id
    pub fn get(&self, variant_id: &VariantId) -> Result<&Variant> {
        self.records
            .get(variant_id)
            .ok_or_else(|| ResolveError::NotFound {
                variant_id: variant_id.clone(),
            })
    }

    /// All variants sharing the coordinates, ascending id; empty if none
    pub fn group(&self, series_id: &str, year: i32, mint_mark: &str) -> Vec<&Variant> {
        self.group_by_key(&GroupKey::new(series_id, year, mint_mark))
    }

    pub fn group_by_key(&self, key: &GroupKey) -> Vec<&Variant> {
        self.groups
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.records.get(id)).collect())
            .unwrap_or_default()
    }

    /// Mint marks that have at least one variant for the series and year
    pub fn mints_for(&self, series_id: &str, year: i32) -> BTreeSet<String> {
        let series_id = series_id.trim();
        self.groups
            .keys()
            .filter(|k| k.series_id == series_id && k.year == year)
            .map(|k| k.mint_mark.clone())
            .collect()
    }

    /// Direct children, ascending id
    pub fn children(&self, variant_id: &VariantId) -> Result<Vec<&Variant>> {
        self.get(variant_id)?;
        Ok(self.child_records(variant_id))
    }

    fn child_records(&self, variant_id: &VariantId) -> Vec<&Variant> {
        self.children
            .get(variant_id)
            .map(|ids| ids.iter().filter_map(|id| self.records.get(id)).collect())
            .unwrap_or_default()
    }

    /// Parent chain, nearest first
    pub fn ancestors(&self, variant_id: &VariantId) -> Result<Vec<&Variant>> {
        let mut current = self.get(variant_id)?;
        let mut chain = Vec::new();

        // A validated tree has at most MAX_DEPTH - 1 ancestors
        while let Some(parent_id) = &current.parent_variant_id {
            if chain.len() >= MAX_DEPTH {
                break;
            }
            current = self.get(parent_id)?;
            chain.push(current);
        }
        Ok(chain)
    }

    /// All descendants, breadth-first, ascending id within each level
    pub fn descendants(&self, variant_id: &VariantId) -> Result<Vec<&Variant>> {
        self.get(variant_id)?;

        let mut found = Vec::new();
        let mut queue: VecDeque<(&VariantId, usize)> = VecDeque::new();
        queue.push_back((variant_id, 0));

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= MAX_DEPTH {
                continue;
            }
            for child in self.child_records(id) {
                found.push(child);
                queue.push_back((&child.variant_id, depth + 1));
            }
        }
        Ok(found)
    }

    /// Normalized keyword tokens of a variant (empty for unknown ids)
    pub fn keyword_tokens(&self, variant_id: &VariantId) -> &BTreeSet<String> {
        self.keyword_tokens.get(variant_id).unwrap_or(&NO_TOKENS)
    }

    /// Tokens of the variant's keywords that appear whole in `hints`
    ///
    /// A keyword counts only when all of its tokens are present, so `"8/7"`
    /// needs both `8` and `7`.
    pub fn matched_keywords(&self, variant_id: &VariantId, hints: &BTreeSet<String>) -> BTreeSet<String> {
        self.keyword_phrases
            .get(variant_id)
            .map(|phrases| text::matched_tokens(phrases, hints))
            .unwrap_or_default()
    }

    /// Union of every variant's normalized keyword tokens
    pub fn keyword_vocabulary(&self) -> &BTreeSet<String> {
        &self.vocabulary
    }

    /// Family report for display tools
    pub fn report(&self, variant_id: &VariantId) -> Result<HierarchySnapshotReport> {
        let variant = self.get(variant_id)?;
        Ok(HierarchySnapshotReport {
            variant_id: variant.variant_id.clone(),
            level: variant.resolution_level,
            ancestors: self
                .ancestors(variant_id)?
                .into_iter()
                .map(VariantSummary::from)
                .collect(),
            descendants: self
                .descendants(variant_id)?
                .into_iter()
                .map(VariantSummary::from)
                .collect(),
            snapshot_version: self.version,
        })
    }
}
