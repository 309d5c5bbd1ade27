//! Canned service responses

use csl_client::{
    AgentInfo, AgentStepDto, ChatResponse, ExecuteCodeResponse, GeneratedCode, HistoryMessage,
    PreprocessResponse, SessionInfo, UploadResponse,
};
use serde_json::{json, Map, Value};

pub fn agent_step(name: &str, confidence: f64, duration_ms: u64) -> AgentStepDto {
    AgentStepDto {
        agent_name: name.to_string(),
        result: format!("{name} result"),
        confidence,
        reasoning: String::new(),
        duration_ms,
        visualizations: Vec::new(),
    }
}

/// Chat response whose execution order follows `steps`
pub fn chat_response(
    session_id: Option<&str>,
    answer: &str,
    confidence: f64,
    steps: Vec<AgentStepDto>,
) -> ChatResponse {
    let execution_order = steps.iter().map(|s| s.agent_name.clone()).collect();
    ChatResponse {
        session_id: session_id.map(str::to_string),
        answer: answer.to_string(),
        confidence,
        agent_steps: steps,
        execution_order,
        visualizations: Vec::new(),
    }
}

pub fn upload_response(file_id: &str, rows: u64, columns: u64) -> UploadResponse {
    UploadResponse {
        file_id: file_id.to_string(),
        filename: "data.csv".to_string(),
        rows,
        columns,
        column_names: (0..columns).map(|i| format!("col{i}")).collect(),
        numeric_columns: Vec::new(),
        categorical_columns: Vec::new(),
    }
}

pub fn changes(rows_before: u64, rows_after: u64) -> Map<String, Value> {
    match json!({ "rows_before": rows_before, "rows_after": rows_after }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn preprocess_response(new_file_id: &str, rows_before: u64, rows_after: u64) -> PreprocessResponse {
    PreprocessResponse {
        success: true,
        new_file_id: new_file_id.to_string(),
        operation: String::new(),
        changes: changes(rows_before, rows_after),
        conversions: Vec::new(),
        preview: Vec::new(),
    }
}

pub fn generated_code(code: &str) -> GeneratedCode {
    GeneratedCode {
        success: true,
        code: code.to_string(),
        explanation: "generated".to_string(),
        warnings: Vec::new(),
    }
}

pub fn execute_success(new_file_id: &str, rows_before: u64, rows_after: u64) -> ExecuteCodeResponse {
    ExecuteCodeResponse {
        success: true,
        new_file_id: Some(new_file_id.to_string()),
        code: Some("df = df.dropna()".to_string()),
        explanation: Some("generated".to_string()),
        changes: changes(rows_before, rows_after),
        error: None,
    }
}

pub fn execute_failure(error: &str, code: Option<&str>) -> ExecuteCodeResponse {
    ExecuteCodeResponse {
        success: false,
        new_file_id: None,
        code: code.map(str::to_string),
        explanation: None,
        changes: Map::new(),
        error: Some(error.to_string()),
    }
}

pub fn profile_body(rows: u64, columns: &[&str]) -> Value {
    json!({
        "shape": { "rows": rows, "columns": columns.len() },
        "columns": columns
            .iter()
            .map(|c| json!({ "name": c, "dtype": "float64", "missing_pct": 0.0, "unique_count": rows }))
            .collect::<Vec<_>>(),
        "missing_summary": {},
        "warnings": []
    })
}

pub fn history_message(role: &str, content: &str, confidence: Option<f64>) -> HistoryMessage {
    HistoryMessage {
        role: role.to_string(),
        content: content.to_string(),
        confidence,
        timestamp: None,
        extra: Map::new(),
    }
}

pub fn session_info(session_id: &str, message_count: u64) -> SessionInfo {
    SessionInfo {
        session_id: session_id.to_string(),
        created_at: "2026-01-02T10:00:00".to_string(),
        message_count,
        last_activity: "2026-01-02T10:05:00".to_string(),
    }
}

pub fn agent_info(name: &str, is_available: bool) -> AgentInfo {
    AgentInfo {
        name: name.to_string(),
        description: format!("{name} agent"),
        is_available,
        config: Map::new(),
    }
}

/// The five agents the service registers by default
pub fn default_roster() -> Vec<AgentInfo> {
    ["calculator", "data_analyst", "law_expert", "risk_analyst", "strategist"]
        .into_iter()
        .map(|name| agent_info(name, true))
        .collect()
}
