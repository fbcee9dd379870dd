//! Variant records and their coordinates

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable unique identifier of a catalog variant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VariantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Depth of a variant in its family tree
///
/// Serialized as the plain integer 1-4. Any other integer fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResolutionLevel {
    /// Least specific entry for a (series, year, mint)
    Base = 1,
    /// Design differences
    MajorVariety = 2,
    /// Error varieties (overdates, doubled dies, ...)
    SpecialVariety = 3,
    /// Strike method (proof, satin, ...)
    StrikeType = 4,
}

impl ResolutionLevel {
    /// Deepest level a variant can have
    pub const MAX: ResolutionLevel = ResolutionLevel::StrikeType;

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The level one step more specific, if any
    pub fn child(self) -> Option<ResolutionLevel> {
        ResolutionLevel::try_from(self.as_u8() + 1).ok()
    }

    pub fn label(self) -> &'static str {
        match self {
            ResolutionLevel::Base => "Base Variant",
            ResolutionLevel::MajorVariety => "Major Variety",
            ResolutionLevel::SpecialVariety => "Special Variety",
            ResolutionLevel::StrikeType => "Strike Type",
        }
    }
}

impl TryFrom<u8> for ResolutionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ResolutionLevel::Base),
            2 => Ok(ResolutionLevel::MajorVariety),
            3 => Ok(ResolutionLevel::SpecialVariety),
            4 => Ok(ResolutionLevel::StrikeType),
            other => Err(format!("resolution_level must be 1-4, got {}", other)),
        }
    }
}

impl From<ResolutionLevel> for u8 {
    fn from(level: ResolutionLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for ResolutionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u8(), self.label())
    }
}

/// Coarse coordinates shared by all variants of one base item
///
/// Mint marks are keyed by their upper-case form so `"d"` and `"D"` land in
/// the same group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub series_id: String,
    pub year: i32,
    pub mint_mark: String,
}

impl GroupKey {
    pub fn new(series_id: &str, year: i32, mint_mark: &str) -> Self {
        Self {
            series_id: series_id.trim().to_string(),
            year,
            mint_mark: normalize_mint(mint_mark),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.series_id, self.year, self.mint_mark)
    }
}

/// Canonical (upper-case, trimmed) form of a mint mark
pub fn normalize_mint(mint_mark: &str) -> String {
    mint_mark.trim().to_uppercase()
}

/// A single taxonomic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: VariantId,
    pub series_id: String,
    pub year: i32,
    pub mint_mark: String,

    /// Reference to the parent record; the store owns every record
    #[serde(default)]
    pub parent_variant_id: Option<VariantId>,

    pub resolution_level: ResolutionLevel,

    /// Compared only among base variants of one group; higher wins
    #[serde(default)]
    pub priority_score: i32,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub keywords: BTreeSet<String>,

    /// Base flag as written by the catalog, checked against the computed value
    #[serde(
        rename = "is_base_variant",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub declared_base: Option<bool>,
}

impl Variant {
    /// Create a base variant (level 1, no parent)
    pub fn base(id: impl Into<VariantId>, series_id: &str, year: i32, mint_mark: &str) -> Self {
        Self {
            variant_id: id.into(),
            series_id: series_id.to_string(),
            year,
            mint_mark: mint_mark.to_string(),
            parent_variant_id: None,
            resolution_level: ResolutionLevel::Base,
            priority_score: 0,
            description: String::new(),
            keywords: BTreeSet::new(),
            declared_base: None,
        }
    }

    /// Create a child of `parent`, one level deeper and in the same group
    ///
    /// Returns None when the parent is already at the deepest level.
    pub fn child_of(parent: &Variant, id: impl Into<VariantId>) -> Option<Self> {
        let level = parent.resolution_level.child()?;
        Some(Self {
            variant_id: id.into(),
            series_id: parent.series_id.clone(),
            year: parent.year,
            mint_mark: parent.mint_mark.clone(),
            parent_variant_id: Some(parent.variant_id.clone()),
            resolution_level: level,
            priority_score: 0,
            description: String::new(),
            keywords: BTreeSet::new(),
            declared_base: None,
        })
    }

    pub fn with_priority(mut self, priority_score: i32) -> Self {
        self.priority_score = priority_score;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// True iff the variant has no parent and sits at level 1
    pub fn is_base_variant(&self) -> bool {
        self.parent_variant_id.is_none() && self.resolution_level == ResolutionLevel::Base
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.series_id, self.year, &self.mint_mark)
    }
}
