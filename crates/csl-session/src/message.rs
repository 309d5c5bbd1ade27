//! Conversation log entries

use crate::agent::AgentStep;
use crate::agent::clamp_confidence;
use chrono::{DateTime, NaiveDateTime, Utc};
use csl_client::{HistoryMessage, Visualization};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique message identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Generate new message ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human
    User,
    /// The agent panel
    Assistant,
}

/// Immutable conversation log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id
    pub id: MessageId,
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
    /// Answer confidence (assistant answers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Copy of the turn's steps (assistant answers only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_steps: Vec<AgentStep>,
    /// Copy of the turn's charts (assistant answers only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visualizations: Vec<Visualization>,
    /// Whether this message reports a failed turn
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    /// User query
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            confidence: None,
            agent_steps: Vec::new(),
            visualizations: Vec::new(),
            is_error: false,
        }
    }

    /// Assistant answer for a completed turn
    #[must_use]
    pub fn answer(
        content: impl Into<String>,
        confidence: f64,
        agent_steps: Vec<AgentStep>,
        visualizations: Vec<Visualization>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            confidence: Some(confidence),
            agent_steps,
            visualizations,
            ..Self::user(content)
        }
    }

    /// Assistant message describing a failed turn
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            is_error: true,
            ..Self::user(content)
        }
    }

    /// Rebuild a log entry from stored server history
    ///
    /// Roles other than `user` and `assistant` yield `None`. Timestamps are
    /// RFC 3339 or naive ISO 8601 (read as UTC); anything else becomes now.
    #[must_use]
    pub fn from_history(stored: HistoryMessage) -> Option<Self> {
        let role = match stored.role.to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => return None,
        };
        let timestamp = stored
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Some(Self {
            role,
            timestamp,
            confidence: match role {
                Role::Assistant => stored.confidence.map(clamp_confidence),
                Role::User => None,
            },
            ..Self::user(stored.content)
        })
    }

    /// Whether this is an assistant message
    #[inline]
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}
