//! Session state and its derived reads

use crate::agent::{AgentName, AgentStep};
use crate::message::Message;
use csl_client::AgentInfo;
use serde::{Deserialize, Serialize};

/// What happens to the server-side session token on reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionResetPolicy {
    /// Drop the token; the next query starts a fresh server-side conversation
    #[default]
    NewSession,
    /// Keep the token; the server keeps its context behind an empty visible log
    KeepSession,
}

/// Per-agent status for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Not involved
    Idle,
    /// Turn in flight, no step yet
    Waiting,
    /// Step available
    Completed,
    /// The roster reports the agent as unavailable
    Unavailable,
}

/// Snapshot of one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Server-assigned session token
    pub session_id: Option<String>,
    /// Append-only conversation log
    pub messages: Vec<Message>,
    /// A turn is in flight
    pub is_loading: bool,
    /// Steps of the latest completed turn
    pub agent_steps: Vec<AgentStep>,
    /// Order in which the latest turn's agents ran
    pub execution_order: Vec<AgentName>,
    /// Last turn failure, if any
    pub error: Option<String>,
    /// Agents registered with the service, as of the last roster refresh
    #[serde(default)]
    pub roster: Vec<AgentInfo>,
}

impl SessionState {
    /// Confidence of the most recent assistant message, 0 if none
    #[must_use]
    pub fn overall_confidence(&self) -> f64 {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .and_then(|m| m.confidence)
            .unwrap_or(0.0)
    }

    /// Step for an agent in the latest turn
    #[must_use]
    pub fn step(&self, agent: &AgentName) -> Option<&AgentStep> {
        self.agent_steps.iter().find(|s| &s.agent == agent)
    }

    /// Status of an agent, recomputed on every read
    #[must_use]
    pub fn agent_status(&self, agent: &AgentName) -> AgentStatus {
        if self.step(agent).is_some() {
            return AgentStatus::Completed;
        }
        let unavailable = self
            .roster
            .iter()
            .any(|a| !a.is_available && a.name == agent.as_str());
        match (unavailable, self.is_loading) {
            (true, _) => AgentStatus::Unavailable,
            (false, true) => AgentStatus::Waiting,
            (false, false) => AgentStatus::Idle,
        }
    }

    /// Agents on the panel: the fetched roster, or the built-in set before
    /// the first refresh
    #[must_use]
    pub fn agents(&self) -> Vec<AgentName> {
        if self.roster.is_empty() {
            return AgentName::KNOWN.to_vec();
        }
        self.roster
            .iter()
            .map(|a| AgentName::from(a.name.as_str()))
            .collect()
    }

    /// Sum of step durations in the latest turn
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.agent_steps
            .iter()
            .fold(0u64, |total, s| total.saturating_add(s.duration_ms))
    }

    pub(crate) fn clear_visible(&mut self, policy: SessionResetPolicy) {
        self.messages.clear();
        self.agent_steps.clear();
        self.execution_order.clear();
        self.error = None;
        if policy == SessionResetPolicy::NewSession {
            self.session_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, confidence: f64) -> AgentStep {
        AgentStep {
            agent: AgentName::from(name),
            confidence,
            duration_ms: 10,
            result: String::new(),
            reasoning: String::new(),
            visualizations: Vec::new(),
        }
    }

    #[test]
    fn overall_confidence_uses_latest_assistant() {
        let mut state = SessionState::default();
        assert_eq!(state.overall_confidence(), 0.0);

        state.messages.push(Message::user("q"));
        state.messages.push(Message::answer("a", 0.7, vec![], vec![]));
        state.messages.push(Message::user("q2"));
        assert!((state.overall_confidence() - 0.7).abs() < f64::EPSILON);

        state.messages.push(Message::error("failed"));
        assert_eq!(state.overall_confidence(), 0.0);
    }

    #[test]
    fn agent_status_projection() {
        let mut state = SessionState {
            agent_steps: vec![step("calculator", 0.9)],
            ..SessionState::default()
        };
        assert_eq!(state.agent_status(&AgentName::Calculator), AgentStatus::Completed);
        assert_eq!(state.agent_status(&AgentName::Strategist), AgentStatus::Idle);

        state.is_loading = true;
        assert_eq!(state.agent_status(&AgentName::Strategist), AgentStatus::Waiting);
        assert_eq!(state.agent_status(&AgentName::Calculator), AgentStatus::Completed);
    }

    #[test]
    fn roster_marks_unavailable_agents() {
        let mut state = SessionState {
            roster: vec![
                csl_test_utils::fixtures::agent_info("calculator", true),
                csl_test_utils::fixtures::agent_info("law_expert", false),
                csl_test_utils::fixtures::agent_info("economist", true),
            ],
            ..SessionState::default()
        };
        assert_eq!(state.agent_status(&AgentName::LawExpert), AgentStatus::Unavailable);
        assert_eq!(state.agent_status(&AgentName::Calculator), AgentStatus::Idle);
        state.is_loading = true;
        assert_eq!(state.agent_status(&AgentName::LawExpert), AgentStatus::Unavailable);
        assert_eq!(
            state.agents(),
            vec![AgentName::Calculator, AgentName::LawExpert, AgentName::from("economist")]
        );
        assert_eq!(SessionState::default().agents().len(), 5);
    }

    #[test]
    fn reset_policy_controls_session_id() {
        let mut state = SessionState {
            session_id: Some("s".into()),
            messages: vec![Message::user("q")],
            error: Some("e".into()),
            ..SessionState::default()
        };
        state.clear_visible(SessionResetPolicy::KeepSession);
        assert_eq!(state.session_id.as_deref(), Some("s"));
        assert!(state.messages.is_empty());
        assert!(state.error.is_none());

        state.clear_visible(SessionResetPolicy::NewSession);
        assert_eq!(state.session_id, None);
    }
}
