//! Lineage errors
//!
//! A lineage error is fatal to the attempted transformation only; the ledger
//! and its current pointer are left exactly as they were.

use crate::version::{FileId, Operation};
use csl_client::ClientError;

/// Ledger rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// Parent version is not in the ledger
    #[error("parent version {0} is not registered")]
    OrphanParent(FileId),

    /// Version id is already registered
    #[error("version {0} is already registered")]
    DuplicateVersion(FileId),

    /// Lookup of an unknown version
    #[error("unknown version {0}")]
    UnknownVersion(FileId),

    /// Derivations cannot be recorded as uploads
    #[error("{0} is not a derivation operation")]
    NotADerivation(Operation),
}

/// Failures of a dataset transformation (upload or preprocessing)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Parameters rejected before any remote call
    #[error("invalid parameters: {0}")]
    Validation(String),

    /// No dataset has been uploaded yet
    #[error("no current dataset; upload a file first")]
    NoCurrentDataset,

    /// Remote call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Ledger rejected the resulting version
    #[error(transparent)]
    Lineage(#[from] LineageError),
}
