//! Error types for the remote service boundary
//!
//! Two failure families cross this boundary:
//! - Transport failures (network errors, timeouts, non-success HTTP status)
//! - Domain failures (the service answered `success: false` with a reason)
//!
//! Both are `Clone` so a single failed call can be handed to every caller
//! that was waiting on it.

/// Errors produced by an [`AnalysisService`](crate::AnalysisService) call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Network failure, timeout, or non-success HTTP status
    #[error("transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status, when the service answered at all
        status: Option<u16>,
        /// Human-readable reason
        message: String,
    },

    /// The service answered but reported failure
    #[error("service reported failure: {0}")]
    Domain(String),

    /// The response body did not match the expected shape
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport error without an HTTP status
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Transport error for a non-success HTTP status
    #[inline]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Check if this is a transport-level failure
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a domain-level failure
    #[inline]
    #[must_use]
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// HTTP status, if any
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        let status = err.status().map(|s| s.as_u16());
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::Transport { status, message }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status() {
        let err = ClientError::http(404, "file not found");
        assert_eq!(err.to_string(), "transport error (HTTP 404): file not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_transport());
    }

    #[test]
    fn transport_display_without_status() {
        let err = ClientError::transport("connection refused");
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn domain_is_not_transport() {
        let err = ClientError::Domain("code generation failed".into());
        assert!(err.is_domain());
        assert!(!err.is_transport());
    }
}
