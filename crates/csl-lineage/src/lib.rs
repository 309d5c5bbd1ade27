//! Consilium lineage - dataset version ledger
//!
//! Tracks a working dataset through a chain of transformations:
//! - Every upload creates a root [`DatasetVersion`]
//! - Every successful transformation registers a child version and moves the
//!   current pointer to it
//! - Older versions stay addressable by id; nothing is mutated in place
//!
//! # Example
//!
//! ```rust,ignore
//! use csl_lineage::{Ledger, LineageStore, FileId, Operation, VersionMetadata};
//!
//! let ledger = Ledger::new();
//! ledger.register_upload(FileId::new("F0"), VersionMetadata::shape(100, 4))?;
//! ledger.register_derivation(&FileId::new("F0"), Operation::Dedup, FileId::new("F1"), VersionMetadata::shape(97, 4))?;
//! assert_eq!(ledger.current_file_id(), Some(FileId::new("F1")));
//! ```

pub mod error;
pub mod ledger;
pub mod transform;
pub mod version;

pub use error::{LineageError, TransformError};
pub use ledger::{Ledger, LineageStore};
pub use transform::{
    derived_metadata, DatasetTransformer, MissingMethod, OutlierMethod, Preprocess, TargetType,
    TransformOutcome, DEFAULT_OUTLIER_THRESHOLD,
};
pub use version::{DatasetVersion, FileId, Operation, VersionMetadata};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
