//! Wire types exchanged with the remote service
//!
//! Field names follow the service's snake_case JSON. Optional fields default
//! so that older or partial responses still decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ── Chat ──

/// `POST chat` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User question
    pub query: String,
    /// Session token echoed back to preserve server-side context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Create a request for a query
    #[inline]
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
        }
    }

    /// With session id
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Chart payload attached to an agent step or an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Visualization {
    /// Chart kind (bar, line, pie, ...)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Chart title
    #[serde(default)]
    pub title: String,
    /// Data points
    #[serde(default)]
    pub data: Vec<Value>,
    /// One-line interpretation
    #[serde(default)]
    pub insight: String,
}

/// One agent's contribution as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStepDto {
    /// Agent identifier
    pub agent_name: String,
    /// Agent output text
    #[serde(default)]
    pub result: String,
    /// Confidence in `[0, 1]`
    #[serde(default)]
    pub confidence: f64,
    /// Agent reasoning trace
    #[serde(default)]
    pub reasoning: String,
    /// Wall-clock time spent
    #[serde(default)]
    pub duration_ms: u64,
    /// Charts produced by this agent
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}

/// `POST chat` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Session token assigned or confirmed by the service
    #[serde(default)]
    pub session_id: Option<String>,
    /// Synthesized final answer
    pub answer: String,
    /// Overall confidence in `[0, 1]`
    #[serde(default)]
    pub confidence: f64,
    /// Per-agent steps for this turn
    #[serde(default)]
    pub agent_steps: Vec<AgentStepDto>,
    /// Order in which the agents ran
    #[serde(default)]
    pub execution_order: Vec<String>,
    /// All charts for this turn
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}

// ── Session history ──

/// One server-side conversation as listed by `GET sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session token
    pub session_id: String,
    /// Creation time as reported by the service
    #[serde(default)]
    pub created_at: String,
    /// Messages stored for the session
    #[serde(default)]
    pub message_count: u64,
    /// Time of the latest exchange
    #[serde(default)]
    pub last_activity: String,
}

/// `GET sessions` response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionList {
    /// Known sessions
    #[serde(default)]
    pub sessions: Vec<SessionInfo>,
    /// Count reported by the service
    #[serde(default)]
    pub total: u64,
}

/// One stored message of a server-side conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// `user` or `assistant`
    pub role: String,
    /// Message text
    #[serde(default)]
    pub content: String,
    /// Answer confidence (assistant messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// When the service stored the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET sessions/{id}/messages` response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    /// Messages, oldest first
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

// ── Agent roster ──

/// One registered agent as listed by `GET agents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Agent identifier, as used in chat steps
    pub name: String,
    /// What the agent does
    #[serde(default)]
    pub description: String,
    /// Whether the agent can take part in a turn
    #[serde(default)]
    pub is_available: bool,
    /// Agent configuration as reported by the service
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// `GET agents` response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentList {
    /// Registered agents
    #[serde(default)]
    pub agents: Vec<AgentInfo>,
    /// Count reported by the service
    #[serde(default)]
    pub total: u64,
}

/// `GET agents/{name}/status` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusReport {
    /// Agent identifier
    pub name: String,
    /// Service-side state (`ready`, ...)
    #[serde(default)]
    pub status: String,
    /// Whether an instance is loaded
    #[serde(default)]
    pub has_instance: bool,
    /// Time of the agent's last run
    #[serde(default)]
    pub last_execution: Option<String>,
}

// ── Datasets ──

/// `POST upload` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Identifier of the stored dataset
    pub file_id: String,
    /// Original file name
    #[serde(default)]
    pub filename: String,
    /// Row count
    #[serde(default)]
    pub rows: u64,
    /// Column count
    #[serde(default)]
    pub columns: u64,
    /// All column names
    #[serde(default)]
    pub column_names: Vec<String>,
    /// Numeric column names
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// Non-numeric column names
    #[serde(default)]
    pub categorical_columns: Vec<String>,
}

/// Per-column statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name
    pub name: String,
    /// Storage type as reported by the service
    pub dtype: String,
    /// Percentage of missing cells
    #[serde(default)]
    pub missing_pct: f64,
    /// Distinct value count
    #[serde(default, alias = "unique")]
    pub unique_count: u64,
    /// Mean (numeric columns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Median (numeric columns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    /// Standard deviation (numeric columns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    /// Minimum (numeric columns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum (numeric columns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Statistics not modelled above (quartiles, skewness, raw missing count)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Preprocessing operation path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessKind {
    /// Missing-value handling
    Missing,
    /// Outlier handling
    Outliers,
    /// Duplicate removal
    Duplicates,
    /// Column type conversion
    ConvertType,
}

impl PreprocessKind {
    /// URL path segment for this operation
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Outliers => "outliers",
            Self::Duplicates => "duplicates",
            Self::ConvertType => "convert-type",
        }
    }

    /// Operation name the service expects in the request body
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Missing => "handle_missing",
            Self::Outliers => "handle_outliers",
            Self::Duplicates => "remove_duplicates",
            Self::ConvertType => "convert_type",
        }
    }
}

/// `POST preprocess/{kind}` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessRequest {
    /// Dataset version to transform
    pub file_id: String,
    /// Operation name, see [`PreprocessKind::operation`]
    pub operation: String,
    /// Target columns (empty means all applicable)
    #[serde(default)]
    pub columns: Vec<String>,
    /// Method name understood by the service
    pub method: String,
    /// Fill value for the `constant` method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant_value: Option<f64>,
    /// IQR multiplier or z-score threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// `POST preprocess/{kind}` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessResponse {
    /// Whether the transformation was applied
    #[serde(default = "default_true")]
    pub success: bool,
    /// Identifier of the newly stored version
    pub new_file_id: String,
    /// Operation name echoed by the service
    #[serde(default)]
    pub operation: String,
    /// Change summary (rows before/after, counts, ...)
    #[serde(default)]
    pub changes: Map<String, Value>,
    /// Per-column conversion report (type conversion only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversions: Vec<Value>,
    /// First rows of the new version
    #[serde(default)]
    pub preview: Vec<Value>,
}

fn default_true() -> bool {
    true
}

// ── AI code generation ──

/// `POST ai-preprocess/{generate,execute}-code` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    /// Dataset version the instruction targets
    pub file_id: String,
    /// Natural-language instruction
    pub instruction: String,
    /// Extra context for the generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// `POST ai-preprocess/generate-code` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Whether generation succeeded
    pub success: bool,
    /// Generated code
    #[serde(default)]
    pub code: String,
    /// Explanation of what the code does
    #[serde(default)]
    pub explanation: String,
    /// Generator warnings
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// `POST ai-preprocess/execute-code` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteCodeResponse {
    /// Whether execution succeeded
    pub success: bool,
    /// New version id on success
    #[serde(default)]
    pub new_file_id: Option<String>,
    /// Code that was (or would have been) executed
    #[serde(default)]
    pub code: Option<String>,
    /// Explanation of the code
    #[serde(default)]
    pub explanation: Option<String>,
    /// Change summary on success
    #[serde(default)]
    pub changes: Map<String, Value>,
    /// Failure reason
    #[serde(default)]
    pub error: Option<String>,
}

// ── Generic analysis ──

/// HTTP verb for an analysis route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Parameters in path and query string
    Get,
    /// Parameters in a JSON body
    Post,
}

/// Location of an analysis endpoint, relative to the service base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP verb
    pub verb: Verb,
    /// Path relative to the base URL
    pub path: String,
    /// Query parameters (GET only)
    pub query: BTreeMap<String, String>,
}

impl Route {
    /// GET route
    #[inline]
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            verb: Verb::Get,
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// POST route
    #[inline]
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            verb: Verb::Post,
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// Add a query parameter
    #[inline]
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.verb {
            Verb::Get => "GET",
            Verb::Post => "POST",
        };
        write!(f, "{verb} {}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_missing_session() {
        let body = serde_json::to_value(ChatRequest::new("hello")).unwrap();
        assert_eq!(body, serde_json::json!({ "query": "hello" }));

        let body =
            serde_json::to_value(ChatRequest::new("hello").with_session(Some("s1".into()))).unwrap();
        assert_eq!(body["session_id"], "s1");
    }

    #[test]
    fn chat_response_tolerates_missing_optionals() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "answer": "42",
            "confidence": 0.8,
            "agent_steps": [{ "agent_name": "calculator", "confidence": 0.9, "duration_ms": 120 }]
        }))
        .unwrap();
        assert_eq!(resp.session_id, None);
        assert_eq!(resp.agent_steps[0].result, "");
        assert!(resp.execution_order.is_empty());
    }

    #[test]
    fn convert_type_response_without_changes() {
        let resp: PreprocessResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "new_file_id": "abc",
            "operation": "convert_type",
            "conversions": [{ "column": "age", "from": "object", "to": "float64" }],
            "preview": []
        }))
        .unwrap();
        assert!(resp.changes.is_empty());
        assert_eq!(resp.conversions.len(), 1);
    }

    #[test]
    fn column_profile_accepts_unique_alias() {
        let col: ColumnProfile = serde_json::from_value(serde_json::json!({
            "name": "age", "dtype": "int64", "missing_pct": 1.5, "unique": 40, "mean": 31.2
        }))
        .unwrap();
        assert_eq!(col.unique_count, 40);
        assert_eq!(col.median, None);
        assert!(col.extra.is_empty());
    }

    #[test]
    fn column_profile_keeps_unmodelled_statistics() {
        let col: ColumnProfile = serde_json::from_value(serde_json::json!({
            "name": "x", "dtype": "float64", "missing": 1, "missing_pct": 33.3,
            "unique": 2, "q1": 1.25, "q3": 2.75, "skewness": 0.4, "kurtosis": -1.2
        }))
        .unwrap();
        assert_eq!(col.extra.len(), 5);
        let back = serde_json::to_value(&col).unwrap();
        assert_eq!(back["missing"], 1);
        assert_eq!(back["q1"], 1.25);
        assert_eq!(back["skewness"], 0.4);
        assert_eq!(back["kurtosis"], -1.2);
        assert_eq!(back["unique_count"], 2);
    }

    #[test]
    fn history_messages_keep_unknown_fields() {
        let history: SessionHistory = serde_json::from_value(serde_json::json!({
            "messages": [
                { "role": "user", "content": "Q1", "timestamp": "2026-01-02T10:00:00" },
                { "role": "assistant", "content": "A1", "confidence": 0.7, "agents_used": ["calculator"] }
            ]
        }))
        .unwrap();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].timestamp.as_deref(), Some("2026-01-02T10:00:00"));
        assert_eq!(history.messages[1].confidence, Some(0.7));
        assert_eq!(history.messages[1].extra["agents_used"][0], "calculator");
    }

    #[test]
    fn agent_list_defaults() {
        let list: AgentList = serde_json::from_value(serde_json::json!({
            "agents": [{ "name": "law_expert", "description": "legal review" }]
        }))
        .unwrap();
        assert_eq!(list.agents[0].name, "law_expert");
        assert!(!list.agents[0].is_available);
        assert!(list.agents[0].config.is_empty());
    }

    #[test]
    fn preprocess_kind_paths() {
        assert_eq!(PreprocessKind::ConvertType.path(), "convert-type");
        assert_eq!(PreprocessKind::Duplicates.path(), "duplicates");
    }
}
