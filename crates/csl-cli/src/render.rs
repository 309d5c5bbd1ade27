//! Plain-text rendering

use csl_core::client::{AgentInfo, SessionInfo};
use csl_core::lineage::DatasetVersion;
use csl_core::session::{AgentName, AgentStatus, Restore, SessionState, Submission};
use csl_core::{ConsiliumError, ErrorCategory};
use serde_json::Value;

fn percent(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Outcome of one chat turn
pub(crate) fn turn(state: &SessionState, submission: &Submission) {
    match submission {
        Submission::Rejected(reason) => println!("not sent: {reason:?}"),
        Submission::Discarded => println!("response discarded after reset"),
        Submission::Failed(e) => println!("error: {e}"),
        Submission::Answered => {
            if let Some(answer) = state.messages.last() {
                println!("{}", answer.content);
            }
            println!();
            println!("confidence: {}", percent(state.overall_confidence()));
            timeline(state);
        }
    }
}

/// Agent timeline of the latest turn
pub(crate) fn timeline(state: &SessionState) {
    let entries = state.timeline();
    if entries.is_empty() {
        println!("no agent steps yet");
        return;
    }
    for entry in entries {
        println!(
            "  {:<16} {:>6}ms → {:>6}ms  {}",
            entry.agent.display_name(),
            entry.start_ms,
            entry.end_ms(),
            percent(entry.confidence)
        );
    }
    println!("  total {}ms", state.total_duration_ms());
}

/// Stored conversations
pub(crate) fn sessions(sessions: &[SessionInfo]) {
    if sessions.is_empty() {
        println!("no stored sessions");
    }
    for s in sessions {
        println!(
            "  {}  {} messages, last active {}",
            s.session_id, s.message_count, s.last_activity
        );
    }
}

/// Outcome of resuming a stored conversation
pub(crate) fn restore(state: &SessionState, outcome: &Restore) {
    match outcome {
        Restore::Rejected(reason) => println!("not resumed: {reason:?}"),
        Restore::Discarded => println!("history discarded after reset"),
        Restore::Failed(e) => println!("error: {e}"),
        Restore::Restored(count) => {
            for message in &state.messages {
                println!("[{:?}] {}", message.role, message.content);
            }
            println!("{count} messages restored");
        }
    }
}

/// Agent roster with per-agent status
pub(crate) fn agents(state: &SessionState, roster: &[AgentInfo]) {
    for agent in roster {
        let status = match state.agent_status(&AgentName::from(agent.name.as_str())) {
            AgentStatus::Idle => "idle",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Completed => "completed",
            AgentStatus::Unavailable => "unavailable",
        };
        println!("  {:<16} {:<12} {}", agent.name, status, agent.description);
    }
}

/// One dataset version
pub(crate) fn version(version: &DatasetVersion) {
    let parent = version
        .parent_file_id
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    println!(
        "{} ({}) {} rows × {} columns, parent {}",
        version.file_id,
        version.created_by.as_str(),
        version.row_count(),
        version.column_count(),
        parent
    );
}

/// Lineage, newest first
pub(crate) fn lineage(versions: &[DatasetVersion]) {
    if versions.is_empty() {
        println!("no dataset uploaded");
    }
    for v in versions {
        version(v);
    }
}

/// Pretty JSON under a heading
pub(crate) fn json(title: &str, value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{title}:\n{text}"),
        Err(_) => println!("{title}: {value}"),
    }
}

/// An error, prefixed by its category
pub(crate) fn error(e: &ConsiliumError) {
    let label = match e.category() {
        ErrorCategory::Validation => "invalid",
        ErrorCategory::Transport => "service error",
        ErrorCategory::Domain => "rejected",
        ErrorCategory::Lineage => "lineage error",
        ErrorCategory::Config => "config error",
    };
    println!("{label}: {e}");
}
