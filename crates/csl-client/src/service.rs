//! The remote analysis/reasoning service seam
//!
//! Everything above this trait (session manager, ledger, coordinators) talks to
//! the service only through [`AnalysisService`], so tests inject a scripted
//! implementation and production wires in [`HttpAnalysisService`](crate::HttpAnalysisService).

use crate::error::ClientError;
use crate::wire::{
    AgentInfo, AgentStatusReport, ChatRequest, ChatResponse, CodeRequest, ExecuteCodeResponse,
    GeneratedCode, HistoryMessage, PreprocessKind, PreprocessRequest, PreprocessResponse, Route,
    SessionInfo, UploadResponse,
};
use serde_json::Value;

/// Request/response calls against the remote service
///
/// Every method is a suspension point; none of them hold client-side locks.
/// Timeouts surface as [`ClientError::Transport`].
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submit one conversation turn
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// Conversations the service keeps
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ClientError>;

    /// Stored messages of one conversation, oldest first
    async fn session_messages(&self, session_id: &str)
        -> Result<Vec<HistoryMessage>, ClientError>;

    /// Drop a conversation on the service side
    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError>;

    /// Registered agents
    async fn list_agents(&self) -> Result<Vec<AgentInfo>, ClientError>;

    /// Run state of one agent
    async fn agent_status(&self, name: &str) -> Result<AgentStatusReport, ClientError>;

    /// Upload a tabular file, yielding a new root dataset id
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError>;

    /// Apply a preprocessing operation, yielding a derived dataset id
    async fn preprocess(
        &self,
        kind: PreprocessKind,
        request: &PreprocessRequest,
    ) -> Result<PreprocessResponse, ClientError>;

    /// Translate an instruction into code without running it
    async fn generate_code(&self, request: &CodeRequest) -> Result<GeneratedCode, ClientError>;

    /// Generate and run code for an instruction, yielding a derived dataset id
    async fn execute_code(&self, request: &CodeRequest)
        -> Result<ExecuteCodeResponse, ClientError>;

    /// Call an analysis endpoint
    ///
    /// `body` is sent as JSON for POST routes and ignored for GET routes.
    async fn analyze(&self, route: &Route, body: Option<&Value>) -> Result<Value, ClientError>;
}
