//! Error umbrella
//!
//! Wraps every crate's error and projects it onto four user-facing
//! categories:
//! - `Validation`: fix the parameters or upload a dataset first
//! - `Transport`: the service could not be reached or answered badly
//! - `Domain`: the service refused the request
//! - `Lineage`: the ledger rejected a new version; the current one is intact
//!
//! Nothing is retried automatically.

use crate::config::ConfigError;
use csl_analysis::{AnalysisError, CodeExecError};
use csl_client::ClientError;
use csl_lineage::{LineageError, TransformError};

/// User-facing error family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected locally before any remote call
    Validation,
    /// Network, timeout, non-success status or malformed response
    Transport,
    /// The service answered `success: false`
    Domain,
    /// Version registration rejected
    Lineage,
    /// Configuration could not be loaded
    Config,
}

/// Errors surfaced by [`Consilium`](crate::Consilium)
#[derive(Debug, thiserror::Error)]
pub enum ConsiliumError {
    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Remote call failure outside any coordinator
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Ledger rejection
    #[error(transparent)]
    Lineage(#[from] LineageError),

    /// Upload or preprocessing failure
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Analysis failure
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// AI code generation or execution failure
    #[error(transparent)]
    CodeExec(#[from] CodeExecError),
}

fn client_category(e: &ClientError) -> ErrorCategory {
    match e {
        ClientError::Domain(_) => ErrorCategory::Domain,
        ClientError::Transport { .. } | ClientError::Decode(_) => ErrorCategory::Transport,
    }
}

impl ConsiliumError {
    /// Category of this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Client(e) => client_category(e),
            Self::Lineage(_) => ErrorCategory::Lineage,
            Self::Transform(e) => match e {
                TransformError::Validation(_) | TransformError::NoCurrentDataset => {
                    ErrorCategory::Validation
                }
                TransformError::Client(c) => client_category(c),
                TransformError::Lineage(_) => ErrorCategory::Lineage,
            },
            Self::Analysis(e) => match e {
                AnalysisError::Validation(_) | AnalysisError::NoCurrentDataset => {
                    ErrorCategory::Validation
                }
                AnalysisError::Client(c) => client_category(c),
                AnalysisError::Decode { .. } => ErrorCategory::Transport,
            },
            Self::CodeExec(e) => match e {
                CodeExecError::EmptyInstruction | CodeExecError::NoCurrentDataset => {
                    ErrorCategory::Validation
                }
                CodeExecError::Client(c) => client_category(c),
                CodeExecError::Domain { .. } => ErrorCategory::Domain,
                CodeExecError::Lineage(_) => ErrorCategory::Lineage,
            },
        }
    }

    /// Whether the user can fix this by changing their input
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Domain
        )
    }
}
