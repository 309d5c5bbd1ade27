//! The dataset version ledger
//!
//! Holds every registered [`DatasetVersion`] as a tree rooted at uploads, plus
//! the single `current` pointer every analysis reads through.
//!
//! Registration inserts the node and moves the pointer under one write lock,
//! so readers never observe a node without the matching pointer (or the
//! reverse). No lock is ever held across an `.await`.

use crate::error::LineageError;
use crate::version::{DatasetVersion, FileId, Operation, VersionMetadata};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{info, warn};

/// Read/write access to dataset lineage
///
/// Coordinators take an `Arc<dyn LineageStore>` so tests can substitute a
/// fake ledger.
pub trait LineageStore: Send + Sync {
    /// Register a new root version and make it current
    ///
    /// # Errors
    /// [`LineageError::DuplicateVersion`] if `file_id` is already registered.
    fn register_upload(
        &self,
        file_id: FileId,
        metadata: VersionMetadata,
    ) -> Result<DatasetVersion, LineageError>;

    /// Register a version derived from `parent` and make it current
    ///
    /// # Errors
    /// - [`LineageError::NotADerivation`] for [`Operation::Upload`]
    /// - [`LineageError::OrphanParent`] if `parent` is not registered
    /// - [`LineageError::DuplicateVersion`] if `new_file_id` is already registered
    fn register_derivation(
        &self,
        parent: &FileId,
        operation: Operation,
        new_file_id: FileId,
        metadata: VersionMetadata,
    ) -> Result<DatasetVersion, LineageError>;

    /// The working dataset, if any upload happened
    fn current_file_id(&self) -> Option<FileId>;

    /// Look up a version
    fn get(&self, file_id: &FileId) -> Option<DatasetVersion>;

    /// Parent chain from `file_id` back to its upload, inclusive at both ends
    ///
    /// # Errors
    /// [`LineageError::UnknownVersion`] if `file_id` is not registered.
    fn lineage(&self, file_id: &FileId) -> Result<Vec<DatasetVersion>, LineageError>;

    /// Direct children of a version, in registration order
    fn children(&self, file_id: &FileId) -> Vec<DatasetVersion>;

    /// Every version in registration order
    fn versions(&self) -> Vec<DatasetVersion>;
}

#[derive(Debug, Default)]
struct LedgerInner {
    versions: HashMap<FileId, DatasetVersion>,
    order: Vec<FileId>,
    current: Option<FileId>,
}

impl LedgerInner {
    fn insert(&mut self, version: DatasetVersion) {
        self.order.push(version.file_id.clone());
        self.current = Some(version.file_id.clone());
        self.versions.insert(version.file_id.clone(), version);
    }
}

/// In-memory lineage ledger
#[derive(Debug, Default)]
pub struct Ledger {
    inner: RwLock<LedgerInner>,
}

impl Ledger {
    /// Create an empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered versions
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().versions.len()
    }

    /// Whether nothing was registered yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().versions.is_empty()
    }

    /// Whether a version is registered
    #[must_use]
    pub fn contains(&self, file_id: &FileId) -> bool {
        self.inner.read().versions.contains_key(file_id)
    }
}

impl LineageStore for Ledger {
    fn register_upload(
        &self,
        file_id: FileId,
        metadata: VersionMetadata,
    ) -> Result<DatasetVersion, LineageError> {
        let mut inner = self.inner.write();
        if inner.versions.contains_key(&file_id) {
            warn!(%file_id, "duplicate upload rejected");
            return Err(LineageError::DuplicateVersion(file_id));
        }
        let version = DatasetVersion {
            file_id,
            parent_file_id: None,
            created_by: Operation::Upload,
            metadata,
            created_at: Utc::now(),
        };
        inner.insert(version.clone());
        info!(
            file_id = %version.file_id,
            rows = version.row_count(),
            columns = version.column_count(),
            "registered upload"
        );
        Ok(version)
    }

    fn register_derivation(
        &self,
        parent: &FileId,
        operation: Operation,
        new_file_id: FileId,
        metadata: VersionMetadata,
    ) -> Result<DatasetVersion, LineageError> {
        if operation.is_root() {
            return Err(LineageError::NotADerivation(operation));
        }
        let mut inner = self.inner.write();
        if !inner.versions.contains_key(parent) {
            warn!(%parent, %operation, "derivation from unregistered parent rejected");
            return Err(LineageError::OrphanParent(parent.clone()));
        }
        if inner.versions.contains_key(&new_file_id) {
            warn!(%new_file_id, %operation, "duplicate derivation rejected");
            return Err(LineageError::DuplicateVersion(new_file_id));
        }
        let version = DatasetVersion {
            file_id: new_file_id,
            parent_file_id: Some(parent.clone()),
            created_by: operation,
            metadata,
            created_at: Utc::now(),
        };
        inner.insert(version.clone());
        info!(
            %parent,
            file_id = %version.file_id,
            %operation,
            rows = version.row_count(),
            "registered derivation"
        );
        Ok(version)
    }

    fn current_file_id(&self) -> Option<FileId> {
        self.inner.read().current.clone()
    }

    fn get(&self, file_id: &FileId) -> Option<DatasetVersion> {
        self.inner.read().versions.get(file_id).cloned()
    }

    fn lineage(&self, file_id: &FileId) -> Result<Vec<DatasetVersion>, LineageError> {
        let inner = self.inner.read();
        let mut chain = Vec::new();
        let mut cursor = Some(file_id.clone());
        while let Some(id) = cursor {
            let version = inner
                .versions
                .get(&id)
                .ok_or_else(|| LineageError::UnknownVersion(id.clone()))?;
            cursor = version.parent_file_id.clone();
            chain.push(version.clone());
        }
        Ok(chain)
    }

    fn children(&self, file_id: &FileId) -> Vec<DatasetVersion> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.versions.get(id))
            .filter(|v| v.parent_file_id.as_ref() == Some(file_id))
            .cloned()
            .collect()
    }

    fn versions(&self) -> Vec<DatasetVersion> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.versions.get(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FileId {
        FileId::new(s)
    }

    #[test]
    fn upload_sets_current() {
        let ledger = Ledger::new();
        assert_eq!(ledger.current_file_id(), None);

        ledger
            .register_upload(id("F0"), VersionMetadata::shape(100, 4))
            .unwrap();
        assert_eq!(ledger.current_file_id(), Some(id("F0")));
        assert!(ledger.get(&id("F0")).unwrap().is_root());
    }

    #[test]
    fn duplicate_upload_rejected() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::default()).unwrap();
        ledger.register_upload(id("G0"), VersionMetadata::default()).unwrap();

        let err = ledger
            .register_upload(id("F0"), VersionMetadata::default())
            .unwrap_err();
        assert_eq!(err, LineageError::DuplicateVersion(id("F0")));
        assert_eq!(ledger.current_file_id(), Some(id("G0")));
    }

    #[test]
    fn derivation_advances_current() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::shape(100, 4)).unwrap();
        let v = ledger
            .register_derivation(&id("F0"), Operation::MissingHandling, id("F1"), VersionMetadata::shape(96, 4))
            .unwrap();

        assert_eq!(v.parent_file_id, Some(id("F0")));
        assert_eq!(ledger.current_file_id(), Some(id("F1")));
    }

    #[test]
    fn orphan_parent_rejected() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::default()).unwrap();

        let err = ledger
            .register_derivation(&id("nope"), Operation::Dedup, id("F1"), VersionMetadata::default())
            .unwrap_err();
        assert_eq!(err, LineageError::OrphanParent(id("nope")));
        assert_eq!(ledger.current_file_id(), Some(id("F0")));
        assert!(!ledger.contains(&id("F1")));
    }

    #[test]
    fn upload_is_not_a_derivation() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::default()).unwrap();
        let err = ledger
            .register_derivation(&id("F0"), Operation::Upload, id("F1"), VersionMetadata::default())
            .unwrap_err();
        assert_eq!(err, LineageError::NotADerivation(Operation::Upload));
    }

    #[test]
    fn lineage_walks_to_root() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::default()).unwrap();
        ledger
            .register_derivation(&id("F0"), Operation::Dedup, id("F1"), VersionMetadata::default())
            .unwrap();
        ledger
            .register_derivation(&id("F1"), Operation::TypeConvert, id("F2"), VersionMetadata::default())
            .unwrap();

        let chain: Vec<_> = ledger
            .lineage(&id("F2"))
            .unwrap()
            .into_iter()
            .map(|v| v.file_id)
            .collect();
        assert_eq!(chain, vec![id("F2"), id("F1"), id("F0")]);
        assert_eq!(
            ledger.lineage(&id("X")).unwrap_err(),
            LineageError::UnknownVersion(id("X"))
        );
    }

    #[test]
    fn older_versions_stay_addressable() {
        let ledger = Ledger::new();
        ledger.register_upload(id("F0"), VersionMetadata::default()).unwrap();
        ledger
            .register_derivation(&id("F0"), Operation::Dedup, id("F1"), VersionMetadata::default())
            .unwrap();
        // Branch from the older version: the tree keeps both children
        ledger
            .register_derivation(&id("F0"), Operation::OutlierHandling, id("F2"), VersionMetadata::default())
            .unwrap();

        assert_eq!(ledger.current_file_id(), Some(id("F2")));
        let kids: Vec<_> = ledger.children(&id("F0")).into_iter().map(|v| v.file_id).collect();
        assert_eq!(kids, vec![id("F1"), id("F2")]);
        assert_eq!(ledger.versions().len(), 3);
    }
}
