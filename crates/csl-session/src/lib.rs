//! Consilium session - multi-agent conversation state
//!
//! Tracks one query as it fans out to several agents and is reassembled into
//! a single answer:
//! - Append-only message log with per-answer confidence and step copies
//! - Latest turn's agent steps and execution order, replaced wholesale per turn
//! - Derived reads: overall confidence, per-agent status, timeline, flow, ranking
//! - Server-side session history (list, restore, delete) and the agent roster

pub mod agent;
pub mod manager;
pub mod message;
pub mod state;
pub mod views;

pub use agent::{clamp_confidence, AgentName, AgentStep};
pub use manager::{ConversationManager, Rejection, Restore, Submission};
pub use message::{Message, MessageId, Role};
pub use state::{AgentStatus, SessionResetPolicy, SessionState};
pub use views::{Flow, FlowNode, FlowNodeKind, TimelineEntry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
