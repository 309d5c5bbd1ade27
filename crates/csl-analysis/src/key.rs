//! Cache keys

use crate::kind::AnalysisKind;
use csl_lineage::FileId;
use serde::{Deserialize, Serialize};

/// blake3 digest of normalized parameters, hex-encoded
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Hash canonical bytes
    #[must_use]
    pub fn of(canonical: &[u8]) -> Self {
        Self(blake3::hash(canonical).to_hex().to_string())
    }

    /// Hex digest
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one replayable analysis request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Analysis kind
    pub kind: AnalysisKind,
    /// Dataset version
    pub file_id: FileId,
    /// Normalized parameter signature
    pub signature: Signature,
}

impl CacheKey {
    /// Create a key
    #[inline]
    #[must_use]
    pub fn new(kind: AnalysisKind, file_id: FileId, signature: Signature) -> Self {
        Self {
            kind,
            file_id,
            signature,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.kind, self.file_id, self.signature.short())
    }
}
