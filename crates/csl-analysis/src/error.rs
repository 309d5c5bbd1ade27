//! Error types for analysis and code execution
//!
//! Every error here is `Clone`: one failed fetch is handed to every caller
//! that joined it.

use crate::kind::AnalysisKind;
use csl_client::ClientError;
use csl_lineage::LineageError;

/// Parameters rejected locally, before any remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A mandatory parameter is unbound
    #[error("{kind}: missing required parameter `{param}`")]
    MissingParameter {
        /// Analysis kind
        kind: AnalysisKind,
        /// Parameter name
        param: String,
    },

    /// A parameter is bound to an unusable value
    #[error("{kind}: invalid parameter `{param}`: {reason}")]
    InvalidParameter {
        /// Analysis kind
        kind: AnalysisKind,
        /// Parameter name
        param: String,
        /// Why the value is rejected
        reason: String,
    },
}

impl ValidationError {
    /// Missing parameter
    #[inline]
    #[must_use]
    pub fn missing(kind: AnalysisKind, param: impl Into<String>) -> Self {
        Self::MissingParameter {
            kind,
            param: param.into(),
        }
    }

    /// Invalid parameter
    #[inline]
    #[must_use]
    pub fn invalid(
        kind: AnalysisKind,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            kind,
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter
    #[must_use]
    pub fn param(&self) -> &str {
        match self {
            Self::MissingParameter { param, .. } | Self::InvalidParameter { param, .. } => param,
        }
    }
}

/// Analysis request failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// Parameters rejected locally
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No dataset uploaded and no explicit file id given
    #[error("no current dataset; upload a file first")]
    NoCurrentDataset,

    /// Remote call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Result did not match the kind's expected shape
    #[error("{kind} result could not be decoded: {message}")]
    Decode {
        /// Analysis kind
        kind: AnalysisKind,
        /// Decoder message
        message: String,
    },
}

impl AnalysisError {
    /// Whether the user can fix this by changing parameters
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// AI code generation/execution failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodeExecError {
    /// Instruction was empty
    #[error("instruction must not be empty")]
    EmptyInstruction,

    /// No dataset uploaded
    #[error("no current dataset; upload a file first")]
    NoCurrentDataset,

    /// Remote call failed at the transport level
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Service refused or failed to generate/run the code
    #[error("code execution failed: {message}")]
    Domain {
        /// Service-supplied reason
        message: String,
        /// The code that was rejected, when echoed back
        code: Option<String>,
    },

    /// Ledger rejected the resulting version
    #[error(transparent)]
    Lineage(#[from] LineageError),
}
