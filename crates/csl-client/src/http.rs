//! reqwest-backed [`AnalysisService`]

use crate::error::ClientError;
use crate::service::AnalysisService;
use crate::wire::{
    AgentInfo, AgentList, AgentStatusReport, ChatRequest, ChatResponse, CodeRequest,
    ExecuteCodeResponse, GeneratedCode, HistoryMessage, PreprocessKind, PreprocessRequest,
    PreprocessResponse, Route, SessionHistory, SessionInfo, SessionList, UploadResponse, Verb,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the remote service
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisService {
    /// Create a client with the default timeout
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, DEFAULT_TIMEOUT, None)
    }

    /// Create a client with an explicit timeout and optional user agent
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the TLS backend cannot be initialized.
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder.build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing reqwest client
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL all routes are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: serde::Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }
}

/// Turn a response into `R`, mapping non-success status to a transport error
async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = detail_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        warn!(status = status.as_u16(), %message, "service returned error status");
        return Err(ClientError::http(status.as_u16(), message));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull the human-readable reason out of an error body
///
/// The service reports failures as `{"detail": ...}` where detail is usually a
/// string but may be a structured validation report.
fn detail_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(body.to_string()),
        },
        _ => Some(body.to_string()),
    }
}

#[async_trait::async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.post_json("chat", request).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ClientError> {
        let list: SessionList = self.get_json("sessions").await?;
        Ok(list.sessions)
    }

    async fn session_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<HistoryMessage>, ClientError> {
        let path = format!("sessions/{}/messages", urlencoding::encode(session_id));
        let history: SessionHistory = self.get_json(&path).await?;
        Ok(history.messages)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        let path = format!("sessions/{}", urlencoding::encode(session_id));
        debug!(path, "DELETE");
        let response = self.client.delete(self.url(&path)).send().await?;
        let _: Value = decode(response).await?;
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, ClientError> {
        let list: AgentList = self.get_json("agents").await?;
        Ok(list.agents)
    }

    async fn agent_status(&self, name: &str) -> Result<AgentStatusReport, ClientError> {
        let path = format!("agents/{}/status", urlencoding::encode(name));
        self.get_json(&path).await
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError> {
        debug!(filename, size = bytes.len(), "upload");
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("analysis/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    async fn preprocess(
        &self,
        kind: PreprocessKind,
        request: &PreprocessRequest,
    ) -> Result<PreprocessResponse, ClientError> {
        let path = format!("analysis/preprocess/{}", kind.path());
        self.post_json(&path, request).await
    }

    async fn generate_code(&self, request: &CodeRequest) -> Result<GeneratedCode, ClientError> {
        self.post_json("analysis/ai-preprocess/generate-code", request)
            .await
    }

    async fn execute_code(
        &self,
        request: &CodeRequest,
    ) -> Result<ExecuteCodeResponse, ClientError> {
        self.post_json("analysis/ai-preprocess/execute-code", request)
            .await
    }

    async fn analyze(&self, route: &Route, body: Option<&Value>) -> Result<Value, ClientError> {
        match route.verb {
            Verb::Get => {
                debug!(path = %route.path, "GET");
                let response = self
                    .client
                    .get(self.url(&route.path))
                    .query(&route.query)
                    .send()
                    .await?;
                decode(response).await
            }
            Verb::Post => {
                let empty = Value::Object(serde_json::Map::new());
                self.post_json(&route.path, body.unwrap_or(&empty)).await
            }
        }
    }
}
