//! Agent identifiers and per-turn steps

use csl_client::{AgentStepDto, Visualization};
use serde::{Deserialize, Serialize};

/// Named reasoning agent
///
/// Unknown names reported by the service are kept verbatim in [`AgentName::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentName {
    /// Numeric calculations
    Calculator,
    /// Data interpretation
    DataAnalyst,
    /// Legal and regulatory review
    LawExpert,
    /// Risk assessment
    RiskAnalyst,
    /// Strategy synthesis
    Strategist,
    /// Any other agent
    Other(String),
}

impl AgentName {
    /// Agents the service is known to run
    pub const KNOWN: [AgentName; 5] = [
        Self::Calculator,
        Self::DataAnalyst,
        Self::LawExpert,
        Self::RiskAnalyst,
        Self::Strategist,
    ];

    /// Wire identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Calculator => "calculator",
            Self::DataAnalyst => "data_analyst",
            Self::LawExpert => "law_expert",
            Self::RiskAnalyst => "risk_analyst",
            Self::Strategist => "strategist",
            Self::Other(name) => name,
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Calculator => "Calculator".into(),
            Self::DataAnalyst => "Data Analyst".into(),
            Self::LawExpert => "Law Expert".into(),
            Self::RiskAnalyst => "Risk Analyst".into(),
            Self::Strategist => "Strategist".into(),
            Self::Other(name) => name.clone(),
        }
    }
}

impl From<String> for AgentName {
    fn from(s: String) -> Self {
        match s.as_str() {
            "calculator" => Self::Calculator,
            "data_analyst" => Self::DataAnalyst,
            "law_expert" => Self::LawExpert,
            "risk_analyst" => Self::RiskAnalyst,
            "strategist" => Self::Strategist,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for AgentName {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<AgentName> for String {
    fn from(name: AgentName) -> Self {
        match name {
            AgentName::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent's contribution to a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// Which agent
    pub agent: AgentName,
    /// Confidence, clamped to `[0, 1]`
    pub confidence: f64,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// Output text
    pub result: String,
    /// Reasoning trace
    #[serde(default)]
    pub reasoning: String,
    /// Charts produced by the agent
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}

impl From<AgentStepDto> for AgentStep {
    fn from(dto: AgentStepDto) -> Self {
        Self {
            agent: AgentName::from(dto.agent_name),
            confidence: clamp_confidence(dto.confidence),
            duration_ms: dto.duration_ms,
            result: dto.result,
            reasoning: dto.reasoning,
            visualizations: dto.visualizations,
        }
    }
}

/// Clamp to `[0, 1]`; NaN becomes 0
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_names_round_trip() {
        for name in AgentName::KNOWN {
            let s: String = name.clone().into();
            assert_eq!(AgentName::from(s), name);
        }
        let other = AgentName::from("economist");
        assert_eq!(other, AgentName::Other("economist".into()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"economist\"");
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(clamp_confidence(1.4), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }
}
