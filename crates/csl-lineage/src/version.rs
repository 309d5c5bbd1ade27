//! Dataset version records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Opaque identifier of one immutable dataset snapshot
///
/// Assigned by the remote service; never minted client-side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Wrap a service-assigned id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for FileId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The transformation that produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// File upload (root of a lineage tree)
    Upload,
    /// Missing-value handling
    MissingHandling,
    /// Outlier handling
    OutlierHandling,
    /// Duplicate-row removal
    Dedup,
    /// Column type conversion
    TypeConvert,
    /// Natural-language instruction turned into executed code
    NlCodeExec,
}

impl Operation {
    /// Whether this operation creates a root version
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Upload)
    }

    /// Stable kebab-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::MissingHandling => "missing-handling",
            Self::OutlierHandling => "outlier-handling",
            Self::Dedup => "dedup",
            Self::TypeConvert => "type-convert",
            Self::NlCodeExec => "nl-code-exec",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape and provenance details supplied when registering a version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Row count
    pub row_count: u64,
    /// Column count
    pub column_count: u64,
    /// Original file name (uploads)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Column names, when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_names: Vec<String>,
    /// Numeric column names, when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric_columns: Vec<String>,
    /// Categorical column names, when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categorical_columns: Vec<String>,
}

impl VersionMetadata {
    /// Metadata with only a shape
    #[inline]
    #[must_use]
    pub fn shape(row_count: u64, column_count: u64) -> Self {
        Self {
            row_count,
            column_count,
            ..Self::default()
        }
    }

    /// With filename
    #[inline]
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// One node in the lineage tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVersion {
    /// This version's id
    pub file_id: FileId,
    /// Parent version; `None` only for uploads
    pub parent_file_id: Option<FileId>,
    /// Operation that produced this version
    pub created_by: Operation,
    /// Shape and provenance
    pub metadata: VersionMetadata,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl DatasetVersion {
    /// Row count
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.metadata.row_count
    }

    /// Column count
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> u64 {
        self.metadata.column_count
    }

    /// Whether this is a root (upload) version
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_file_id.is_none()
    }
}
