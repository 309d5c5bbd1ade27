//! Renderable projections of a turn
//!
//! - [`SessionState::timeline`]: steps in execution order with cumulative offsets
//! - [`SessionState::flow`]: query → agents → answer graph
//! - [`SessionState::ranked_steps`]: steps by confidence, highest first

use crate::agent::{AgentName, AgentStep};
use crate::state::SessionState;
use serde::{Deserialize, Serialize};

/// One bar of the execution timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Agent
    pub agent: AgentName,
    /// Offset from turn start
    pub start_ms: u64,
    /// Step duration
    pub duration_ms: u64,
    /// Step confidence
    pub confidence: f64,
}

impl TimelineEntry {
    /// Offset at which the step finished
    #[inline]
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }
}

/// Node kind in the flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowNodeKind {
    /// The user query
    Query,
    /// One agent
    Agent,
    /// The synthesized answer
    Answer,
}

/// Flow graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Node id, unique within the graph
    pub id: String,
    /// Display label
    pub label: String,
    /// Node kind
    pub kind: FlowNodeKind,
    /// Confidence (agent and answer nodes)
    pub confidence: Option<f64>,
}

/// Directed flow graph of one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Nodes
    pub nodes: Vec<FlowNode>,
    /// Edges as `(from, to)` node ids
    pub edges: Vec<(String, String)>,
}

const QUERY_NODE: &str = "query";
const ANSWER_NODE: &str = "answer";

impl SessionState {
    /// Steps in execution order
    ///
    /// Steps missing from `execution_order` follow in arrival order; order
    /// entries with no step are skipped.
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<&AgentStep> {
        let mut ordered: Vec<&AgentStep> = self
            .execution_order
            .iter()
            .filter_map(|name| self.step(name))
            .collect();
        for step in &self.agent_steps {
            if !self.execution_order.contains(&step.agent) {
                ordered.push(step);
            }
        }
        ordered
    }

    /// Sequential timeline of the latest turn
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        let mut offset = 0u64;
        self.ordered_steps()
            .into_iter()
            .map(|step| {
                let entry = TimelineEntry {
                    agent: step.agent.clone(),
                    start_ms: offset,
                    duration_ms: step.duration_ms,
                    confidence: step.confidence,
                };
                offset = offset.saturating_add(step.duration_ms);
                entry
            })
            .collect()
    }

    /// Flow graph of the latest turn
    #[must_use]
    pub fn flow(&self) -> Flow {
        let mut flow = Flow::default();
        flow.nodes.push(FlowNode {
            id: QUERY_NODE.into(),
            label: "Query".into(),
            kind: FlowNodeKind::Query,
            confidence: None,
        });

        let mut previous = QUERY_NODE.to_string();
        for step in self.ordered_steps() {
            let id = step.agent.as_str().to_string();
            flow.nodes.push(FlowNode {
                id: id.clone(),
                label: step.agent.display_name(),
                kind: FlowNodeKind::Agent,
                confidence: Some(step.confidence),
            });
            flow.edges.push((previous, id.clone()));
            previous = id;
        }

        flow.nodes.push(FlowNode {
            id: ANSWER_NODE.into(),
            label: "Answer".into(),
            kind: FlowNodeKind::Answer,
            confidence: Some(self.overall_confidence()),
        });
        flow.edges.push((previous, ANSWER_NODE.into()));
        flow
    }

    /// Steps by confidence, highest first; ties keep execution order
    #[must_use]
    pub fn ranked_steps(&self) -> Vec<&AgentStep> {
        let mut ranked = self.ordered_steps();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, confidence: f64, duration_ms: u64) -> AgentStep {
        AgentStep {
            agent: AgentName::from(name),
            confidence,
            duration_ms,
            result: String::new(),
            reasoning: String::new(),
            visualizations: Vec::new(),
        }
    }

    fn state() -> SessionState {
        SessionState {
            agent_steps: vec![
                step("strategist", 0.6, 300),
                step("calculator", 0.9, 120),
                step("economist", 0.7, 50),
            ],
            execution_order: vec![AgentName::Calculator, AgentName::Strategist],
            ..SessionState::default()
        }
    }

    #[test]
    fn timeline_follows_execution_order() {
        let tl = state().timeline();
        let agents: Vec<_> = tl.iter().map(|e| e.agent.as_str().to_string()).collect();
        assert_eq!(agents, ["calculator", "strategist", "economist"]);
        assert_eq!(tl[0].start_ms, 0);
        assert_eq!(tl[1].start_ms, 120);
        assert_eq!(tl[2].start_ms, 420);
        assert_eq!(tl[2].end_ms(), 470);
    }

    #[test]
    fn huge_durations_saturate() {
        let s = SessionState {
            agent_steps: vec![step("calculator", 0.9, u64::MAX), step("strategist", 0.5, 5)],
            ..SessionState::default()
        };
        let tl = s.timeline();
        assert_eq!(tl[1].start_ms, u64::MAX);
        assert_eq!(tl[1].end_ms(), u64::MAX);
        assert_eq!(s.total_duration_ms(), u64::MAX);
    }

    #[test]
    fn flow_chains_query_agents_answer() {
        let flow = state().flow();
        assert_eq!(flow.nodes.len(), 5);
        assert_eq!(flow.edges.first().unwrap(), &("query".to_string(), "calculator".to_string()));
        assert_eq!(flow.edges.last().unwrap(), &("economist".to_string(), "answer".to_string()));
        assert_eq!(flow.edges.len(), 4);
    }

    #[test]
    fn flow_without_agents() {
        let flow = SessionState::default().flow();
        assert_eq!(flow.edges, vec![("query".to_string(), "answer".to_string())]);
    }

    #[test]
    fn ranking_by_confidence() {
        let s = state();
        let ranked: Vec<_> = s.ranked_steps().iter().map(|st| st.confidence).collect();
        assert_eq!(ranked, [0.9, 0.7, 0.6]);
    }
}
