//! Conversation session manager
//!
//! Owns the message log and the latest turn's agent steps. Suspension points
//! are the outbound service calls (chat, history, roster); state is locked
//! before and after them, never across them.

use crate::agent::{AgentName, AgentStep};
use crate::message::Message;
use crate::state::{AgentStatus, SessionResetPolicy, SessionState};
use csl_client::{
    AgentInfo, AgentStatusReport, AnalysisService, ChatRequest, ChatResponse, ClientError,
    SessionInfo,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a submission was not sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Query was empty or whitespace
    EmptyQuery,
    /// Another turn is still in flight
    InFlight,
    /// Session id was empty or whitespace
    EmptySessionId,
}

/// Outcome of [`ConversationManager::submit_query`]
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Nothing happened
    Rejected(Rejection),
    /// Turn completed and the answer was appended
    Answered,
    /// Turn failed; an error message was appended
    Failed(ClientError),
    /// The session was reset while the turn was in flight; response dropped
    Discarded,
}

impl Submission {
    /// Whether the query was sent to the service
    #[inline]
    #[must_use]
    pub fn was_sent(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Outcome of [`ConversationManager::restore`]
#[derive(Debug, Clone, PartialEq)]
pub enum Restore {
    /// Nothing happened
    Rejected(Rejection),
    /// The log was replaced by this many stored messages
    Restored(usize),
    /// History could not be loaded; the log is unchanged
    Failed(ClientError),
    /// The session was reset while history was loading; history dropped
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    /// Bumped on reset so a response from before the reset is dropped
    epoch: u64,
}

/// Clears `is_loading` if the in-flight future is dropped before completion
struct LoadingGuard<'a> {
    inner: &'a Mutex<Inner>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().state.is_loading = false;
    }
}

/// Multi-agent conversation manager
pub struct ConversationManager {
    service: Arc<dyn AnalysisService>,
    inner: Mutex<Inner>,
    reset_policy: SessionResetPolicy,
}

impl std::fmt::Debug for ConversationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationManager")
            .field("reset_policy", &self.reset_policy)
            .field("state", &self.inner.lock().state)
            .finish_non_exhaustive()
    }
}

impl ConversationManager {
    /// Create a manager with the default reset policy
    #[must_use]
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self::with_reset_policy(service, SessionResetPolicy::default())
    }

    /// Create a manager with an explicit reset policy
    #[must_use]
    pub fn with_reset_policy(
        service: Arc<dyn AnalysisService>,
        reset_policy: SessionResetPolicy,
    ) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner::default()),
            reset_policy,
        }
    }

    /// Reset policy in effect
    #[inline]
    #[must_use]
    pub fn reset_policy(&self) -> SessionResetPolicy {
        self.reset_policy
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.is_loading
    }

    /// Confidence of the most recent assistant message, 0 if none
    #[must_use]
    pub fn overall_confidence(&self) -> f64 {
        self.inner.lock().state.overall_confidence()
    }

    /// Status of an agent for the current turn
    #[must_use]
    pub fn agent_status(&self, agent: &AgentName) -> AgentStatus {
        self.inner.lock().state.agent_status(agent)
    }

    /// Submit a query as a new turn
    ///
    /// Empty queries and queries issued while a turn is in flight are
    /// rejected without touching state. Failures never propagate as `Err`;
    /// they are recorded in the log and the session `error` field.
    pub async fn submit_query(&self, text: &str) -> Submission {
        let query = text.trim();
        if query.is_empty() {
            return Submission::Rejected(Rejection::EmptyQuery);
        }

        let (request, epoch) = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading {
                debug!("query rejected: turn in flight");
                return Submission::Rejected(Rejection::InFlight);
            }
            inner.state.messages.push(Message::user(query));
            inner.state.is_loading = true;
            inner.state.error = None;
            let request = ChatRequest::new(query).with_session(inner.state.session_id.clone());
            (request, inner.epoch)
        };
        let _guard = LoadingGuard { inner: &self.inner };

        let result = self.service.chat(&request).await;

        let mut inner = self.inner.lock();
        inner.state.is_loading = false;
        if inner.epoch != epoch {
            debug!("session reset during turn; response dropped");
            return Submission::Discarded;
        }
        match result {
            Ok(response) => {
                apply_response(&mut inner.state, response);
                Submission::Answered
            }
            Err(err) => {
                warn!(error = %err, "turn failed");
                let text = format!("Request failed: {err}");
                inner.state.messages.push(Message::error(text));
                inner.state.error = Some(err.to_string());
                Submission::Failed(err)
            }
        }
    }

    /// Resume a server-side conversation
    ///
    /// Replaces the visible log with the stored history and adopts
    /// `session_id` for later turns. Agent steps are cleared because stored
    /// history carries none. Like a turn, this is rejected while another call
    /// is in flight and blocks submissions until it settles.
    pub async fn restore(&self, session_id: &str) -> Restore {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Restore::Rejected(Rejection::EmptySessionId);
        }

        let epoch = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading {
                debug!("restore rejected: call in flight");
                return Restore::Rejected(Rejection::InFlight);
            }
            inner.state.is_loading = true;
            inner.epoch
        };
        let _guard = LoadingGuard { inner: &self.inner };

        let result = self.service.session_messages(session_id).await;

        let mut inner = self.inner.lock();
        inner.state.is_loading = false;
        if inner.epoch != epoch {
            debug!("session reset during restore; history dropped");
            return Restore::Discarded;
        }
        match result {
            Ok(stored) => {
                let messages: Vec<Message> =
                    stored.into_iter().filter_map(Message::from_history).collect();
                let count = messages.len();
                let state = &mut inner.state;
                state.messages = messages;
                state.agent_steps.clear();
                state.execution_order.clear();
                state.error = None;
                state.session_id = Some(session_id.to_string());
                info!(session_id, messages = count, "session restored");
                Restore::Restored(count)
            }
            Err(err) => {
                warn!(session_id, error = %err, "restore failed");
                inner.state.error = Some(err.to_string());
                Restore::Failed(err)
            }
        }
    }

    /// Conversations the service keeps
    ///
    /// # Errors
    /// Propagates the service failure.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ClientError> {
        self.service.list_sessions().await
    }

    /// Delete a server-side conversation
    ///
    /// Deleting the active conversation also clears the visible log and
    /// drops the token, whatever the reset policy.
    ///
    /// # Errors
    /// Propagates the service failure; local state is then unchanged.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.service.delete_session(session_id).await?;
        let mut inner = self.inner.lock();
        if inner.state.session_id.as_deref() == Some(session_id) {
            inner.epoch += 1;
            inner.state.clear_visible(SessionResetPolicy::NewSession);
            info!(session_id, "active session deleted");
        }
        Ok(())
    }

    /// Fetch the agent roster and keep it for status reads
    ///
    /// # Errors
    /// Propagates the service failure; the previous roster is kept.
    pub async fn refresh_agents(&self) -> Result<Vec<AgentInfo>, ClientError> {
        let roster = self.service.list_agents().await?;
        debug!(agents = roster.len(), "roster refreshed");
        self.inner.lock().state.roster = roster.clone();
        Ok(roster)
    }

    /// Agents on the panel, see [`SessionState::agents`]
    #[must_use]
    pub fn agents(&self) -> Vec<AgentName> {
        self.inner.lock().state.agents()
    }

    /// Service-side run state of one agent
    ///
    /// # Errors
    /// Propagates the service failure (unknown agents are a 404).
    pub async fn agent_report(&self, agent: &AgentName) -> Result<AgentStatusReport, ClientError> {
        self.service.agent_status(agent.as_str()).await
    }

    /// Clear the visible conversation
    ///
    /// The session token survives only under [`SessionResetPolicy::KeepSession`].
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        inner.state.clear_visible(self.reset_policy);
        info!(policy = ?self.reset_policy, "session reset");
    }
}

fn apply_response(state: &mut SessionState, response: ChatResponse) {
    if let Some(session_id) = response.session_id.filter(|s| !s.is_empty()) {
        state.session_id = Some(session_id);
    }

    let mut seen = HashSet::new();
    let steps: Vec<AgentStep> = response
        .agent_steps
        .into_iter()
        .map(AgentStep::from)
        .filter(|step| {
            let first = seen.insert(step.agent.clone());
            if !first {
                warn!(agent = %step.agent, "duplicate agent step dropped");
            }
            first
        })
        .collect();

    let mut seen_order = HashSet::new();
    let order: Vec<AgentName> = response
        .execution_order
        .into_iter()
        .map(AgentName::from)
        .filter(|name| seen_order.insert(name.clone()))
        .collect();

    let confidence = crate::agent::clamp_confidence(response.confidence);
    info!(
        agents = steps.len(),
        confidence,
        "turn completed"
    );

    state.messages.push(Message::answer(
        response.answer,
        confidence,
        steps.clone(),
        response.visualizations,
    ));
    state.agent_steps = steps;
    state.execution_order = order;
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_test_utils::{fixtures, MockService};

    fn manager(svc: &Arc<MockService>) -> ConversationManager {
        ConversationManager::new(svc.clone())
    }

    #[tokio::test]
    async fn answer_sets_confidence_and_steps() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(
            Some("s-1"),
            "A1",
            0.9,
            vec![fixtures::agent_step("calculator", 0.9, 120)],
        )));
        let mgr = manager(&svc);

        assert_eq!(mgr.submit_query("Q1").await, Submission::Answered);

        let state = mgr.snapshot();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].confidence, Some(0.9));
        assert_eq!(state.session_id.as_deref(), Some("s-1"));
        assert!((mgr.overall_confidence() - 0.9).abs() < f64::EPSILON);
        assert_eq!(mgr.agent_status(&AgentName::Calculator), AgentStatus::Completed);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn session_id_is_echoed_and_overwritten() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(Some("s-1"), "a", 0.5, vec![])));
        svc.push_chat(Ok(fixtures::chat_response(Some("s-2"), "b", 0.5, vec![])));
        let mgr = manager(&svc);

        mgr.submit_query("first").await;
        mgr.submit_query("second").await;

        let sent = svc.requests("chat");
        assert!(sent[0].get("session_id").is_none());
        assert_eq!(sent[1]["session_id"], "s-1");
        assert_eq!(mgr.snapshot().session_id.as_deref(), Some("s-2"));
    }

    #[tokio::test]
    async fn new_turn_replaces_steps() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(
            None,
            "a",
            0.5,
            vec![
                fixtures::agent_step("calculator", 0.5, 10),
                fixtures::agent_step("strategist", 0.5, 10),
            ],
        )));
        svc.push_chat(Ok(fixtures::chat_response(
            None,
            "b",
            0.8,
            vec![fixtures::agent_step("law_expert", 0.8, 10)],
        )));
        let mgr = manager(&svc);

        mgr.submit_query("one").await;
        mgr.submit_query("two").await;

        let state = mgr.snapshot();
        assert_eq!(state.agent_steps.len(), 1);
        assert_eq!(state.execution_order, vec![AgentName::LawExpert]);
        assert_eq!(mgr.agent_status(&AgentName::Calculator), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn failure_keeps_previous_steps() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(
            None,
            "a",
            0.5,
            vec![fixtures::agent_step("calculator", 0.5, 10)],
        )));
        svc.push_chat(Err(ClientError::http(500, "agent crashed")));
        let mgr = manager(&svc);

        mgr.submit_query("one").await;
        let outcome = mgr.submit_query("two").await;
        assert!(matches!(outcome, Submission::Failed(_)));

        let state = mgr.snapshot();
        assert_eq!(state.messages.len(), 4);
        assert!(state.messages[3].is_error);
        assert_eq!(state.agent_steps.len(), 1);
        assert!(state.error.as_deref().unwrap().contains("agent crashed"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn empty_query_is_noop() {
        let svc = MockService::shared();
        let mgr = manager(&svc);
        assert_eq!(
            mgr.submit_query("   ").await,
            Submission::Rejected(Rejection::EmptyQuery)
        );
        assert!(mgr.snapshot().messages.is_empty());
        assert_eq!(svc.calls("chat"), 0);
    }

    #[tokio::test]
    async fn in_flight_submission_is_noop() {
        let svc = MockService::shared();
        let gate = svc.install_gate();
        let mgr = Arc::new(manager(&svc));

        let first = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.submit_query("slow").await })
        };
        gate.wait_for_entered(1).await;

        let before = mgr.snapshot();
        assert!(before.is_loading);
        assert_eq!(mgr.agent_status(&AgentName::DataAnalyst), AgentStatus::Waiting);

        let second = mgr.submit_query("impatient").await;
        assert_eq!(second, Submission::Rejected(Rejection::InFlight));
        let during = mgr.snapshot();
        assert_eq!(during.messages.len(), before.messages.len());
        assert_eq!(during.agent_steps, before.agent_steps);

        gate.open();
        assert_eq!(first.await.unwrap(), Submission::Answered);
        assert_eq!(svc.calls("chat"), 1);
    }

    #[tokio::test]
    async fn reset_during_turn_discards_response() {
        let svc = MockService::shared();
        let gate = svc.install_gate();
        let mgr = Arc::new(manager(&svc));

        let turn = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.submit_query("q").await })
        };
        gate.wait_for_entered(1).await;
        mgr.reset();
        gate.open();

        assert_eq!(turn.await.unwrap(), Submission::Discarded);
        let state = mgr.snapshot();
        assert!(state.messages.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn duplicate_agent_keeps_first() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(
            None,
            "a",
            0.5,
            vec![
                fixtures::agent_step("calculator", 0.4, 10),
                fixtures::agent_step("calculator", 0.9, 10),
            ],
        )));
        let mgr = manager(&svc);
        mgr.submit_query("q").await;

        let state = mgr.snapshot();
        assert_eq!(state.agent_steps.len(), 1);
        assert!((state.agent_steps[0].confidence - 0.4).abs() < f64::EPSILON);
        assert_eq!(state.execution_order.len(), 1);
    }

    #[tokio::test]
    async fn restore_replaces_log_and_adopts_session() {
        let svc = MockService::shared();
        svc.add_session(
            "s-7",
            vec![
                fixtures::history_message("user", "Q1", None),
                fixtures::history_message("assistant", "A1", Some(0.6)),
                fixtures::history_message("system", "routing", None),
            ],
        );
        let mgr = manager(&svc);
        mgr.submit_query("local").await;

        assert_eq!(mgr.restore("s-7").await, Restore::Restored(2));
        let state = mgr.snapshot();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content, "Q1");
        assert!(state.agent_steps.is_empty());
        assert_eq!(state.session_id.as_deref(), Some("s-7"));
        assert!((mgr.overall_confidence() - 0.6).abs() < f64::EPSILON);

        mgr.submit_query("next").await;
        assert_eq!(svc.requests("chat")[1]["session_id"], "s-7");
    }

    #[tokio::test]
    async fn restore_failure_keeps_log() {
        let svc = MockService::shared();
        let mgr = manager(&svc);
        mgr.submit_query("local").await;

        let outcome = mgr.restore("missing").await;
        assert_eq!(outcome, Restore::Failed(ClientError::http(404, "Session not found")));
        let state = mgr.snapshot();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.session_id.as_deref(), Some("session-1"));
        assert!(state.error.is_some());
        assert_eq!(mgr.restore("  ").await, Restore::Rejected(Rejection::EmptySessionId));
    }

    #[tokio::test]
    async fn restore_is_rejected_during_turn() {
        let svc = MockService::shared();
        svc.add_session("s-7", vec![fixtures::history_message("user", "Q1", None)]);
        let gate = svc.install_gate();
        let mgr = Arc::new(manager(&svc));

        let turn = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.submit_query("slow").await })
        };
        gate.wait_for_entered(1).await;
        assert_eq!(mgr.restore("s-7").await, Restore::Rejected(Rejection::InFlight));
        gate.open();
        assert_eq!(turn.await.unwrap(), Submission::Answered);
        assert_eq!(svc.calls("sessions/s-7/messages"), 0);
    }

    #[tokio::test]
    async fn deleting_active_session_clears_log() {
        let svc = MockService::shared();
        svc.add_session("session-1", Vec::new());
        svc.add_session("other", Vec::new());
        let mgr = ConversationManager::with_reset_policy(svc.clone(), SessionResetPolicy::KeepSession);
        mgr.submit_query("q").await;

        mgr.delete_session("other").await.unwrap();
        assert_eq!(mgr.snapshot().messages.len(), 2);

        mgr.delete_session("session-1").await.unwrap();
        let state = mgr.snapshot();
        assert!(state.messages.is_empty());
        assert_eq!(state.session_id, None);
        assert!(mgr.list_sessions().await.unwrap().is_empty());
        assert!(mgr.delete_session("session-1").await.is_err());
    }

    #[tokio::test]
    async fn roster_refresh_feeds_status() {
        let svc = MockService::shared();
        svc.set_agents(vec![
            fixtures::agent_info("calculator", true),
            fixtures::agent_info("risk_analyst", false),
        ]);
        let mgr = manager(&svc);
        assert_eq!(mgr.agents().len(), 5);

        mgr.refresh_agents().await.unwrap();
        assert_eq!(mgr.agents(), vec![AgentName::Calculator, AgentName::RiskAnalyst]);
        assert_eq!(mgr.agent_status(&AgentName::RiskAnalyst), AgentStatus::Unavailable);

        let report = mgr.agent_report(&AgentName::Calculator).await.unwrap();
        assert_eq!(report.status, "ready");
        assert!(mgr.agent_report(&AgentName::Strategist).await.is_err());
    }

    #[tokio::test]
    async fn keep_session_policy() {
        let svc = MockService::shared();
        svc.push_chat(Ok(fixtures::chat_response(Some("s-9"), "a", 0.5, vec![])));
        let mgr = ConversationManager::with_reset_policy(svc.clone(), SessionResetPolicy::KeepSession);
        mgr.submit_query("q").await;
        mgr.reset();

        let state = mgr.snapshot();
        assert!(state.messages.is_empty());
        assert_eq!(state.session_id.as_deref(), Some("s-9"));
    }
}
