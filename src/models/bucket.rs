//! Typed identity of a counted box bucket.
//!
//! Counting records arrive with string-keyed maps of the form
//! `fuerte_4kg_class1_size24`. This module replaces those ad-hoc strings
//! with a tagged `BucketKey` and re-serializes to the same canonical form
//! for storage keys, so the wire format stays compatible while the rest of
//! the engine works with typed fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Physical box format. Determines per-box weight and the default number
/// of boxes that make up one complete pallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BoxType {
    #[serde(rename = "4kg")]
    FourKg,
    #[serde(rename = "10kg")]
    TenKg,
}

impl BoxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FourKg => "4kg",
            Self::TenKg => "10kg",
        }
    }

    /// Weight of a single packed box, in kilograms.
    pub fn per_box_weight_kg(&self) -> i32 {
        match self {
            Self::FourKg => 4,
            Self::TenKg => 10,
        }
    }

    /// Boxes that make up one complete pallet of this format.
    pub fn default_boxes_per_pallet(&self) -> i32 {
        match self {
            Self::FourKg => 288,
            Self::TenKg => 120,
        }
    }
}

impl FromStr for BoxType {
    type Err = BucketKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "4kg" => Ok(Self::FourKg),
            "10kg" => Ok(Self::TenKg),
            other => Err(BucketKeyParseError::UnknownBoxType(other.to_string())),
        }
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical size code, always rendered as `sizeNN`.
///
/// Counting stages are inconsistent about the token form (`24`, `size24`,
/// `size 24`); parsing accepts all of them and normalizes. Ordering is
/// lexical on the canonical form, which is the tie-break order the
/// derivation output uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SizeKey(String);

impl SizeKey {
    pub fn parse(token: &str) -> Result<Self, BucketKeyParseError> {
        let trimmed = token.trim().to_ascii_lowercase().replace(' ', "");
        let digits = trimmed.strip_prefix("size").unwrap_or(&trimmed);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BucketKeyParseError::InvalidSize(token.to_string()));
        }
        Ok(Self(format!("size{}", digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while decoding a legacy bucket key string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BucketKeyParseError {
    #[error("bucket key '{0}' does not have variety_boxType_grade_size parts")]
    MalformedKey(String),
    #[error("unknown box type token '{0}'")]
    UnknownBoxType(String),
    #[error("invalid size token '{0}'")]
    InvalidSize(String),
}

/// Identity of one counted bucket: variety x box type x grade x size.
///
/// Variety and grade are open string sets (new varieties show up every
/// season); box type and size are normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct BucketKey {
    pub variety: String,
    pub box_type: BoxType,
    pub grade: String,
    pub size: SizeKey,
}

impl BucketKey {
    pub fn new(
        variety: impl Into<String>,
        box_type: BoxType,
        grade: impl Into<String>,
        size: SizeKey,
    ) -> Self {
        Self {
            variety: variety.into(),
            box_type,
            grade: grade.into(),
            size,
        }
    }

    /// Decodes a `variety_boxType_grade_sizeNN` map key.
    ///
    /// Varieties never contain underscores in the counting stage's
    /// vocabulary, so a plain 4-way split is safe. The size token is
    /// accepted in either `NN` or `sizeNN` form.
    pub fn parse(key: &str) -> Result<Self, BucketKeyParseError> {
        let parts: Vec<&str> = key.split('_').collect();
        if parts.len() != 4 {
            return Err(BucketKeyParseError::MalformedKey(key.to_string()));
        }
        let variety = parts[0].trim();
        let grade = parts[2].trim();
        if variety.is_empty() || grade.is_empty() {
            return Err(BucketKeyParseError::MalformedKey(key.to_string()));
        }
        Ok(Self {
            variety: variety.to_ascii_lowercase(),
            box_type: parts[1].parse()?,
            grade: grade.to_ascii_lowercase(),
            size: SizeKey::parse(parts[3])?,
        })
    }

    /// Canonical storage form, identical shape to the counting stage keys.
    pub fn storage_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.variety, self.box_type, self.grade, self.size
        )
    }

    /// Stable per-counting-record balance key. Re-deriving size-groups
    /// from the same record always lands on the same key.
    pub fn unique_key(&self, counting_record_id: uuid::Uuid) -> String {
        format!("{}_{}", counting_record_id, self.storage_key())
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
