//! Upload and preprocessing, recorded as ledger versions
//!
//! Every transformation resolves its input from the ledger's current pointer
//! at call time, asks the service for a new version, and registers that
//! version as a derivation of the input. A failed call leaves the ledger
//! untouched.

use crate::error::TransformError;
use crate::ledger::LineageStore;
use crate::version::{DatasetVersion, FileId, Operation, VersionMetadata};
use csl_client::{AnalysisService, ClientError, PreprocessKind, PreprocessRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Default IQR multiplier for outlier handling
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1.5;

/// Strategy for missing cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingMethod {
    /// Drop rows with missing cells
    #[default]
    Drop,
    /// Fill numeric columns with the mean
    Mean,
    /// Fill numeric columns with the median
    Median,
    /// Fill with the most frequent value
    Mode,
    /// Fill with a fixed value
    Constant,
}

/// Strategy for outliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Drop rows outside the IQR fence
    #[default]
    Drop,
    /// Clip values to the IQR fence
    Clip,
    /// Replace outliers with the median
    MedianReplace,
    /// Drop rows beyond a z-score threshold
    Zscore,
}

/// Target type for conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Numeric (unparseable cells become missing)
    Numeric,
    /// Date/time
    Datetime,
    /// Text
    String,
    /// Categorical
    Category,
}

fn method_name<T: Serialize>(method: &T) -> String {
    match serde_json::to_value(method) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// A preprocessing request against the current dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preprocess {
    /// Handle missing values
    Missing {
        /// Target columns (empty means all)
        columns: Vec<String>,
        /// Strategy
        method: MissingMethod,
        /// Fill value for [`MissingMethod::Constant`]
        constant_value: Option<f64>,
    },
    /// Handle outliers in numeric columns
    Outliers {
        /// Target columns (empty means all numeric)
        columns: Vec<String>,
        /// Strategy
        method: OutlierMethod,
        /// IQR multiplier or z-score threshold
        threshold: f64,
    },
    /// Remove duplicate rows
    Dedup {
        /// Columns that define a duplicate (empty means all)
        subset: Vec<String>,
    },
    /// Convert column types
    ConvertType {
        /// Columns to convert (required)
        columns: Vec<String>,
        /// Target type
        target: TargetType,
    },
}

impl Preprocess {
    /// Ledger operation recorded for this request
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Missing { .. } => Operation::MissingHandling,
            Self::Outliers { .. } => Operation::OutlierHandling,
            Self::Dedup { .. } => Operation::Dedup,
            Self::ConvertType { .. } => Operation::TypeConvert,
        }
    }

    /// Endpoint kind
    #[must_use]
    pub fn kind(&self) -> PreprocessKind {
        match self {
            Self::Missing { .. } => PreprocessKind::Missing,
            Self::Outliers { .. } => PreprocessKind::Outliers,
            Self::Dedup { .. } => PreprocessKind::Duplicates,
            Self::ConvertType { .. } => PreprocessKind::ConvertType,
        }
    }

    /// Check parameters locally
    ///
    /// # Errors
    /// [`TransformError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), TransformError> {
        match self {
            Self::Missing {
                method: MissingMethod::Constant,
                constant_value: None,
                ..
            } => Err(TransformError::Validation(
                "constant fill requires a constant value".into(),
            )),
            Self::Missing {
                constant_value: Some(v),
                ..
            } if !v.is_finite() => Err(TransformError::Validation(
                "constant value must be finite".into(),
            )),
            Self::Outliers { threshold, .. } if !threshold.is_finite() || *threshold <= 0.0 => Err(
                TransformError::Validation("threshold must be a positive number".into()),
            ),
            Self::ConvertType { columns, .. } if columns.iter().all(|c| c.trim().is_empty()) => Err(
                TransformError::Validation("type conversion requires at least one column".into()),
            ),
            _ => Ok(()),
        }
    }

    fn to_request(&self, file_id: &FileId) -> PreprocessRequest {
        let kind = self.kind();
        let (columns, method, constant_value, threshold) = match self {
            Self::Missing {
                columns,
                method,
                constant_value,
            } => (columns.clone(), method_name(method), *constant_value, None),
            Self::Outliers {
                columns,
                method,
                threshold,
            } => (columns.clone(), method_name(method), None, Some(*threshold)),
            Self::Dedup { subset } => (subset.clone(), "drop".to_string(), None, None),
            Self::ConvertType { columns, target } => {
                (columns.clone(), method_name(target), None, None)
            }
        };
        PreprocessRequest {
            file_id: file_id.to_string(),
            operation: kind.operation().to_string(),
            columns,
            method,
            constant_value,
            threshold,
        }
    }
}

/// Result of a successful transformation
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// Newly registered (and now current) version
    pub version: DatasetVersion,
    /// Change summary reported by the service
    pub changes: Map<String, Value>,
    /// Per-column conversion report (type conversion only)
    pub conversions: Vec<Value>,
    /// First rows of the new version
    pub preview: Vec<Value>,
}

fn count(changes: &Map<String, Value>, key: &str) -> Option<u64> {
    changes.get(key).and_then(Value::as_u64)
}

/// Shape of a derived version
///
/// Counts come from `rows_after`/`columns_after` in the change summary and
/// fall back to the parent's. Column name lists carry over only while the
/// column count is unchanged.
#[must_use]
pub fn derived_metadata(
    parent: Option<&DatasetVersion>,
    changes: &Map<String, Value>,
) -> VersionMetadata {
    let parent_meta = parent.map(|p| p.metadata.clone()).unwrap_or_default();
    let row_count = count(changes, "rows_after").unwrap_or(parent_meta.row_count);
    let column_count = count(changes, "columns_after").unwrap_or(parent_meta.column_count);
    if column_count == parent_meta.column_count {
        VersionMetadata {
            row_count,
            column_count,
            filename: parent_meta.filename,
            column_names: parent_meta.column_names,
            numeric_columns: parent_meta.numeric_columns,
            categorical_columns: parent_meta.categorical_columns,
        }
    } else {
        VersionMetadata {
            row_count,
            column_count,
            filename: parent_meta.filename,
            ..VersionMetadata::default()
        }
    }
}

/// Upload and preprocessing front end over the ledger
#[derive(Clone)]
pub struct DatasetTransformer {
    service: Arc<dyn AnalysisService>,
    ledger: Arc<dyn LineageStore>,
}

impl std::fmt::Debug for DatasetTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetTransformer")
            .field("current", &self.ledger.current_file_id())
            .finish_non_exhaustive()
    }
}

impl DatasetTransformer {
    /// Create a transformer over a service and ledger
    #[must_use]
    pub fn new(service: Arc<dyn AnalysisService>, ledger: Arc<dyn LineageStore>) -> Self {
        Self { service, ledger }
    }

    /// Ledger this transformer writes to
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LineageStore> {
        &self.ledger
    }

    /// Upload a file and register it as a new root version
    ///
    /// # Errors
    /// Transport failures, or [`LineageError::DuplicateVersion`](crate::LineageError)
    /// if the service handed back an id that is already registered.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<DatasetVersion, TransformError> {
        let resp = self.service.upload(filename, bytes).await.map_err(|e| {
            warn!(filename, error = %e, "upload failed");
            e
        })?;
        let metadata = VersionMetadata {
            row_count: resp.rows,
            column_count: resp.columns,
            filename: Some(resp.filename.clone()).filter(|f| !f.is_empty()),
            column_names: resp.column_names,
            numeric_columns: resp.numeric_columns,
            categorical_columns: resp.categorical_columns,
        };
        Ok(self.ledger.register_upload(FileId::new(resp.file_id), metadata)?)
    }

    /// Apply a preprocessing step to the current dataset
    ///
    /// # Errors
    /// - [`TransformError::Validation`] before any remote call
    /// - [`TransformError::NoCurrentDataset`] if nothing was uploaded
    /// - transport/domain failures from the service
    /// - lineage rejections of the returned id
    pub async fn preprocess(&self, step: &Preprocess) -> Result<TransformOutcome, TransformError> {
        step.validate()?;
        let parent = self
            .ledger
            .current_file_id()
            .ok_or(TransformError::NoCurrentDataset)?;
        let request = step.to_request(&parent);
        let kind = step.kind();

        let resp = self.service.preprocess(kind, &request).await.map_err(|e| {
            warn!(%parent, kind = kind.path(), error = %e, "preprocess failed");
            e
        })?;
        if !resp.success {
            return Err(ClientError::Domain(format!("{} was not applied", kind.path())).into());
        }

        let parent_version = self.ledger.get(&parent);
        let metadata = derived_metadata(parent_version.as_ref(), &resp.changes);
        let version = self.ledger.register_derivation(
            &parent,
            step.operation(),
            FileId::new(resp.new_file_id),
            metadata,
        )?;
        info!(%parent, file_id = %version.file_id, kind = kind.path(), "preprocess applied");

        Ok(TransformOutcome {
            version,
            changes: resp.changes,
            conversions: resp.conversions,
            preview: resp.preview,
        })
    }
}
