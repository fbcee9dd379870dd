//! Catalog snapshot files
//!
//! JSON layout:
//! ```json
//! { "label": "2026-10 catalog", "variants": [ { "variant_id": "...", ... } ] }
//! ```

use crate::error::{ResolveError, Result};
use crate::models::{SnapshotInfo, Variant};
use crate::store::VariantStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Decoded catalog file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Free-form source label (e.g. export date)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub variants: Vec<Variant>,
}

/// Decode a catalog from JSON text
pub fn parse_catalog(content: &str) -> Result<CatalogFile> {
    serde_json::from_str(content).map_err(|e| ResolveError::Catalog(format!("Invalid catalog JSON: {}", e)))
}

/// Read and decode a catalog file
pub async fn read_catalog(path: &Path) -> Result<CatalogFile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ResolveError::Catalog(format!("Read {} failed: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| {
        ResolveError::Catalog(format!("Invalid catalog JSON in {}: {}", path.display(), e))
    })
}

/// Read a catalog file and load it into the store
///
/// The label falls back to the file path when the file has none.
pub async fn load_catalog_file(store: &VariantStore, path: &Path) -> Result<SnapshotInfo> {
    let catalog = read_catalog(path).await?;
    let label = catalog
        .label
        .or_else(|| Some(path.display().to_string()));
    info!(
        path = %path.display(),
        variants = catalog.variants.len(),
        "Loading catalog file"
    );
    store.load_labeled(catalog.variants, label)
}
