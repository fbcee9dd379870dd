//! Test Helper Utilities
//!
//! Shared catalog fixtures for varmap-resolver integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use varmap_resolver::{CatalogFile, Variant, VariantId, VariantStore};

pub const BUFFALO: &str = "buffalo_nickel";

/// Buffalo nickel catalog slice
///
/// - 1913-P: two base variants, Type 1 (priority 50) and Type 2 (priority 100)
/// - 1918-D: base plus the 8/7 overdate (level 2) and two strike grades (level 3)
/// - 1918-S: single base
/// - 1937-D: base plus the three-legged variety
pub fn buffalo_catalog() -> Vec<Variant> {
    let type1 = Variant::base("bn-1913-p-type1", BUFFALO, 1913, "P")
        .with_priority(50)
        .with_description("1913 Type 1, raised mound")
        .with_keywords(["type 1", "raised mound"]);
    let type2 = Variant::base("bn-1913-p-type2", BUFFALO, 1913, "P")
        .with_priority(100)
        .with_description("1913 Type 2, recessed mound")
        .with_keywords(["type 2", "recessed", "flat ground"]);

    let base_1918 = Variant::base("bn-1918-d", BUFFALO, 1918, "D")
        .with_description("1918-D")
        .with_keywords(["buffalo", "nickel"]);
    let overdate = Variant::child_of(&base_1918, "bn-1918-d-8over7")
        .expect("level 2 exists")
        .with_description("1918/7-D overdate")
        .with_keywords(["overdate", "8/7"]);
    let strong = Variant::child_of(&overdate, "bn-1918-d-8over7-strong")
        .expect("level 3 exists")
        .with_keywords(["strong", "bold"]);
    let weak = Variant::child_of(&overdate, "bn-1918-d-8over7-weak")
        .expect("level 3 exists")
        .with_keywords(["weak", "faint"]);

    let base_1937 = Variant::base("bn-1937-d", BUFFALO, 1937, "D");
    let three_legged = Variant::child_of(&base_1937, "bn-1937-d-3leg")
        .expect("level 2 exists")
        .with_keywords(["three legged", "3 legs", "3-legged"]);

    vec![
        type1,
        type2,
        base_1918,
        overdate,
        strong,
        weak,
        Variant::base("bn-1918-s", BUFFALO, 1918, "S"),
        base_1937,
        three_legged,
    ]
}

pub fn buffalo_store() -> Arc<VariantStore> {
    Arc::new(VariantStore::with_records(buffalo_catalog()).expect("fixture catalog is valid"))
}

/// Catalog with a child whose parent id does not exist
pub fn dangling_catalog() -> Vec<Variant> {
    let mut orphan = Variant::base("bn-1918-d-orphan", BUFFALO, 1918, "D");
    orphan.parent_variant_id = Some(VariantId::new("bn-1918-d-missing"));
    orphan.resolution_level = varmap_resolver::ResolutionLevel::MajorVariety;

    let mut records = buffalo_catalog();
    records.push(orphan);
    records
}

/// Write a catalog JSON file into `dir`
pub fn write_catalog(dir: &Path, name: &str, label: Option<&str>, variants: Vec<Variant>) -> PathBuf {
    let path = dir.join(name);
    let catalog = CatalogFile {
        label: label.map(str::to_string),
        variants,
    };
    let json = serde_json::to_string_pretty(&catalog).expect("catalog serializes");
    std::fs::write(&path, json).expect("write catalog file");
    path
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}
