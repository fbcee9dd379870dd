//! Variant Store
//!
//! Holds the current catalog snapshot behind an `RwLock<Arc<Snapshot>>`.
//! Readers clone the `Arc` and release the lock immediately, so resolution
//! never holds a lock. `load()` validates and indexes the new records outside
//! the lock, then swaps the pointer: concurrent readers see the old snapshot or
//! the new one in full, never a mix.
//!
//! # Lock poisoning
//! The guarded value is only ever replaced by a single pointer assignment, so
//! a poisoned lock still holds a complete snapshot; poisoning is ignored.

mod snapshot;

pub use snapshot::Snapshot;

use crate::error::Result;
use crate::models::{HierarchySnapshotReport, SnapshotInfo, Variant, VariantId};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Variant Store
pub struct VariantStore {
    current: RwLock<Arc<Snapshot>>,
}

impl VariantStore {
    /// Create a store holding the empty snapshot (version 0)
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Create a store and load an initial set of records
    pub fn with_records(records: Vec<Variant>) -> Result<Self> {
        let store = Self::new();
        store.load(records)?;
        Ok(store)
    }

    /// Handle to the current snapshot
    ///
    /// Take one handle per operation so every read sees the same version.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the current snapshot atomically
    ///
    /// # Errors
    /// `ResolveError::InvalidHierarchy` if validation fails; the previous
    /// snapshot stays in effect.
    pub fn load(&self, records: Vec<Variant>) -> Result<SnapshotInfo> {
        self.load_labeled(records, None)
    }

    /// Replace the current snapshot, tagging it with a source label
    pub fn load_labeled(&self, records: Vec<Variant>, label: Option<String>) -> Result<SnapshotInfo> {
        let record_count = records.len();
        let built = match Snapshot::build(records, label) {
            Ok(built) => built,
            Err(e) => {
                warn!(
                    records = record_count,
                    active_version = self.snapshot().version(),
                    "Snapshot load rejected, keeping previous snapshot"
                );
                return Err(e);
            }
        };

        let info = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(built.with_version(current.version() + 1));
            let info = next.info();
            *current = next;
            info
        };

        info!(
            version = info.version,
            label = ?info.label,
            variants = info.variant_count,
            groups = info.group_count,
            "Variant snapshot loaded"
        );
        Ok(info)
    }

    pub fn info(&self) -> SnapshotInfo {
        self.snapshot().info()
    }

    /// Look up a record by id
    pub fn get(&self, variant_id: &VariantId) -> Result<Variant> {
        self.snapshot().get(variant_id).cloned()
    }

    /// All variants sharing the coordinates, ascending id; empty if none
    pub fn group(&self, series_id: &str, year: i32, mint_mark: &str) -> Vec<Variant> {
        self.snapshot()
            .group(series_id, year, mint_mark)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn children(&self, variant_id: &VariantId) -> Result<Vec<Variant>> {
        let snapshot = self.snapshot();
        Ok(snapshot.children(variant_id)?.into_iter().cloned().collect())
    }

    pub fn ancestors(&self, variant_id: &VariantId) -> Result<Vec<Variant>> {
        let snapshot = self.snapshot();
        Ok(snapshot.ancestors(variant_id)?.into_iter().cloned().collect())
    }

    pub fn descendants(&self, variant_id: &VariantId) -> Result<Vec<Variant>> {
        let snapshot = self.snapshot();
        Ok(snapshot.descendants(variant_id)?.into_iter().cloned().collect())
    }

    pub fn mints_for(&self, series_id: &str, year: i32) -> BTreeSet<String> {
        self.snapshot().mints_for(series_id, year)
    }

    pub fn keyword_vocabulary(&self) -> BTreeSet<String> {
        self.snapshot().keyword_vocabulary().clone()
    }

    pub fn report(&self, variant_id: &VariantId) -> Result<HierarchySnapshotReport> {
        self.snapshot().report(variant_id)
    }
}

impl Default for VariantStore {
    fn default() -> Self {
        Self::new()
    }
}
