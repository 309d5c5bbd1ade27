//! Scriptable in-memory [`AnalysisService`]

use crate::fixtures;
use csl_client::{
    AgentInfo, AgentStatusReport, AnalysisService, ChatRequest, ChatResponse, ClientError,
    CodeRequest, ExecuteCodeResponse, GeneratedCode, HistoryMessage, PreprocessKind,
    PreprocessRequest, PreprocessResponse, Route, SessionInfo, UploadResponse,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// Holds calls in flight until released
///
/// A closed gate parks every call after it has been counted, so a test can
/// observe "request in flight" states deterministically.
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    entered: AtomicUsize,
    entered_notify: Notify,
    open: AtomicBool,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            permits: Semaphore::new(0),
            entered: AtomicUsize::new(0),
            entered_notify: Notify::new(),
            open: AtomicBool::new(false),
        }
    }

    /// Let exactly one parked (or future) call through
    pub fn release_one(&self) {
        self.permits.add_permits(1);
    }

    /// Let every current and future call through
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.permits.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    /// Number of calls that reached the gate
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` calls reached the gate
    pub async fn wait_for_entered(&self, n: usize) {
        loop {
            let notified = self.entered_notify.notified();
            if self.entered() >= n {
                return;
            }
            notified.await;
        }
    }

    async fn pass(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.entered_notify.notify_waiters();
        if self.open.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// In-memory service with per-endpoint call counts and scripted responses
///
/// Endpoints without a scripted response fall back to a plausible default.
/// Derived dataset ids come from [`MockService::push_file_ids`] or, when that
/// queue is empty, from a `V<n>` counter.
#[derive(Debug, Default)]
pub struct MockService {
    calls: DashMap<String, usize>,
    requests: Mutex<Vec<(String, Value)>>,
    chat: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
    upload: Mutex<VecDeque<Result<UploadResponse, ClientError>>>,
    preprocess: Mutex<VecDeque<Result<PreprocessResponse, ClientError>>>,
    generate: Mutex<VecDeque<Result<GeneratedCode, ClientError>>>,
    execute: Mutex<VecDeque<Result<ExecuteCodeResponse, ClientError>>>,
    analyze: Mutex<HashMap<String, VecDeque<Result<Value, ClientError>>>>,
    sessions: Mutex<Vec<(SessionInfo, Vec<HistoryMessage>)>>,
    agents: Mutex<Option<Vec<AgentInfo>>>,
    file_ids: Mutex<VecDeque<String>>,
    counter: AtomicU64,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Install a closed gate in front of every endpoint and return it
    pub fn install_gate(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::closed());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn push_chat(&self, response: Result<ChatResponse, ClientError>) {
        self.chat.lock().push_back(response);
    }

    pub fn push_upload(&self, response: Result<UploadResponse, ClientError>) {
        self.upload.lock().push_back(response);
    }

    pub fn push_preprocess(&self, response: Result<PreprocessResponse, ClientError>) {
        self.preprocess.lock().push_back(response);
    }

    pub fn push_generate(&self, response: Result<GeneratedCode, ClientError>) {
        self.generate.lock().push_back(response);
    }

    pub fn push_execute(&self, response: Result<ExecuteCodeResponse, ClientError>) {
        self.execute.lock().push_back(response);
    }

    /// Script the next response for an analysis route path
    pub fn push_analysis(&self, path: &str, response: Result<Value, ClientError>) {
        self.analyze
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Store a server-side conversation with its message history
    pub fn add_session(&self, session_id: &str, messages: Vec<HistoryMessage>) {
        let info = fixtures::session_info(session_id, messages.len() as u64);
        self.sessions.lock().push((info, messages));
    }

    /// Replace the agent roster (defaults to [`fixtures::default_roster`])
    pub fn set_agents(&self, agents: Vec<AgentInfo>) {
        *self.agents.lock() = Some(agents);
    }

    fn roster(&self) -> Vec<AgentInfo> {
        self.agents
            .lock()
            .clone()
            .unwrap_or_else(fixtures::default_roster)
    }

    /// Ids handed out by default upload/preprocess/execute responses
    pub fn push_file_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ids.lock().extend(ids.into_iter().map(Into::into));
    }

    /// Calls observed for an endpoint
    ///
    /// Endpoint names: `chat`, `sessions`, `sessions/<id>/messages`,
    /// `delete sessions/<id>`, `agents`, `agents/<name>/status`, `upload`, `preprocess/<kind>`, `generate-code`,
    /// `execute-code`, or the route path for analysis calls.
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.get(endpoint).map_or(0, |c| *c)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    /// Request bodies recorded for an endpoint, in call order
    pub fn requests(&self, endpoint: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn next_file_id(&self) -> String {
        self.file_ids.lock().pop_front().unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("V{n}")
        })
    }

    async fn record(&self, endpoint: &str, body: Value) {
        *self.calls.entry(endpoint.to_string()).or_insert(0) += 1;
        self.requests.lock().push((endpoint.to_string(), body));
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, ClientError>>>) -> Option<Result<T, ClientError>> {
    queue.lock().pop_front()
}

#[async_trait::async_trait]
impl AnalysisService for MockService {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.record("chat", serde_json::to_value(request).unwrap_or_default())
            .await;
        pop(&self.chat).unwrap_or_else(|| {
            Ok(fixtures::chat_response(
                Some("session-1"),
                "ok",
                0.8,
                vec![fixtures::agent_step("data_analyst", 0.8, 50)],
            ))
        })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ClientError> {
        self.record("sessions", Value::Null).await;
        Ok(self.sessions.lock().iter().map(|(info, _)| info.clone()).collect())
    }

    async fn session_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<HistoryMessage>, ClientError> {
        self.record(&format!("sessions/{session_id}/messages"), Value::Null)
            .await;
        self.sessions
            .lock()
            .iter()
            .find(|(info, _)| info.session_id == session_id)
            .map(|(_, messages)| messages.clone())
            .ok_or_else(|| ClientError::http(404, "Session not found"))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.record(&format!("delete sessions/{session_id}"), Value::Null)
            .await;
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|(info, _)| info.session_id != session_id);
        if sessions.len() == before {
            return Err(ClientError::http(404, "Session not found"));
        }
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, ClientError> {
        self.record("agents", Value::Null).await;
        Ok(self.roster())
    }

    async fn agent_status(&self, name: &str) -> Result<AgentStatusReport, ClientError> {
        self.record(&format!("agents/{name}/status"), Value::Null)
            .await;
        let agent = self
            .roster()
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ClientError::http(404, format!("Agent '{name}' not found")))?;
        Ok(AgentStatusReport {
            name: agent.name,
            status: if agent.is_available { "ready" } else { "unavailable" }.to_string(),
            has_instance: agent.is_available,
            last_execution: None,
        })
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError> {
        self.record("upload", json!({ "filename": filename, "size": bytes.len() }))
            .await;
        pop(&self.upload).unwrap_or_else(|| {
            let mut resp = fixtures::upload_response(&self.next_file_id(), 100, 5);
            resp.filename = filename.to_string();
            Ok(resp)
        })
    }

    async fn preprocess(
        &self,
        kind: PreprocessKind,
        request: &PreprocessRequest,
    ) -> Result<PreprocessResponse, ClientError> {
        let endpoint = format!("preprocess/{}", kind.path());
        self.record(&endpoint, serde_json::to_value(request).unwrap_or_default())
            .await;
        pop(&self.preprocess)
            .unwrap_or_else(|| Ok(fixtures::preprocess_response(&self.next_file_id(), 100, 100)))
    }

    async fn generate_code(&self, request: &CodeRequest) -> Result<GeneratedCode, ClientError> {
        self.record("generate-code", serde_json::to_value(request).unwrap_or_default())
            .await;
        pop(&self.generate).unwrap_or_else(|| Ok(fixtures::generated_code("df = df.dropna()")))
    }

    async fn execute_code(
        &self,
        request: &CodeRequest,
    ) -> Result<ExecuteCodeResponse, ClientError> {
        self.record("execute-code", serde_json::to_value(request).unwrap_or_default())
            .await;
        pop(&self.execute)
            .unwrap_or_else(|| Ok(fixtures::execute_success(&self.next_file_id(), 100, 100)))
    }

    async fn analyze(&self, route: &Route, body: Option<&Value>) -> Result<Value, ClientError> {
        let recorded = body.cloned().unwrap_or_else(|| json!(route.query));
        self.record(&route.path, recorded).await;
        let scripted = self
            .analyze
            .lock()
            .get_mut(&route.path)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(json!({ "route": route.path })))
    }
}
