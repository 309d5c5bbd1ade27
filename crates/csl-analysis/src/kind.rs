//! Analysis kinds

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Every analysis a tab coordinator can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    /// Per-column profile
    Profile,
    /// Correlation matrix
    Correlation,
    /// Two-group significance test
    AbTest,
    /// Time-series decomposition
    Timeseries,
    /// Segment comparison
    Segment,
    /// Forecast
    Forecast,
    /// What-if simulation
    Whatif,
    /// Anomaly detection
    Anomaly,
    /// Business KPI
    BusinessMetrics,
    /// Chart series
    ChartData,
    /// Exploratory summary
    Eda,
    /// Generated narrative insights
    AiInsights,
    /// Generated column descriptions
    ColumnExplain,
    /// Generated data-quality diagnosis
    AiDiagnosis,
    /// Distinct values of one column
    ColumnValues,
    /// Summary statistics of one column
    Describe,
    /// Columns usable as forecast date and value
    ForecastColumns,
}

impl AnalysisKind {
    /// All kinds
    pub const ALL: [AnalysisKind; 17] = [
        Self::Profile,
        Self::Correlation,
        Self::AbTest,
        Self::Timeseries,
        Self::Segment,
        Self::Forecast,
        Self::Whatif,
        Self::Anomaly,
        Self::BusinessMetrics,
        Self::ChartData,
        Self::Eda,
        Self::AiInsights,
        Self::ColumnExplain,
        Self::AiDiagnosis,
        Self::ColumnValues,
        Self::Describe,
        Self::ForecastColumns,
    ];

    /// Stable kebab-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Correlation => "correlation",
            Self::AbTest => "ab-test",
            Self::Timeseries => "timeseries",
            Self::Segment => "segment",
            Self::Forecast => "forecast",
            Self::Whatif => "whatif",
            Self::Anomaly => "anomaly",
            Self::BusinessMetrics => "business-metrics",
            Self::ChartData => "chart-data",
            Self::Eda => "eda",
            Self::AiInsights => "ai-insights",
            Self::ColumnExplain => "column-explain",
            Self::AiDiagnosis => "ai-diagnosis",
            Self::ColumnValues => "column-values",
            Self::Describe => "describe",
            Self::ForecastColumns => "forecast-columns",
        }
    }

    /// Whether the file id travels in the URL path (GET endpoints)
    #[must_use]
    pub fn is_get(&self) -> bool {
        matches!(
            self,
            Self::Profile
                | Self::Correlation
                | Self::Eda
                | Self::ColumnValues
                | Self::Describe
                | Self::ForecastColumns
        )
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for AnalysisKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
