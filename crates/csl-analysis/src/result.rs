//! Kind-specific analysis results
//!
//! The coordinator never inspects results; these types exist for the
//! surfaces that render them. Fields the service adds beyond the modelled
//! ones are kept in each struct's `extra` map.

use crate::error::AnalysisError;
use crate::kind::AnalysisKind;
use csl_client::ColumnProfile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Dataset shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Rows
    pub rows: u64,
    /// Columns
    pub columns: u64,
}

/// Profile of one dataset version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileResult {
    /// Shape
    pub shape: Shape,
    /// Per-column statistics
    pub columns: Vec<ColumnProfile>,
    /// Missing percentage for columns with any missing cells
    pub missing_summary: BTreeMap<String, f64>,
    /// Data-quality warnings
    pub warnings: Vec<String>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Strongly correlated column pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrongCorrelation {
    /// Column pair
    pub pair: Vec<String>,
    /// Coefficient
    pub correlation: f64,
    /// Direction label
    pub direction: String,
}

/// Correlation matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationResult {
    /// Matrix rows (`id` plus one entry per column)
    pub matrix: Vec<Map<String, Value>>,
    /// Pairs with |r| above the strong threshold
    pub strong_correlations: Vec<StrongCorrelation>,
    /// One-line interpretation
    pub insight: String,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Two-group significance test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbTestResult {
    /// Group A summary
    pub group_a: Map<String, Value>,
    /// Group B summary
    pub group_b: Map<String, Value>,
    /// Test family used
    pub test_type: String,
    /// Test statistic
    pub statistic: f64,
    /// p-value
    pub p_value: f64,
    /// Effect size
    pub effect_size: f64,
    /// Confidence interval bounds
    pub confidence_interval: BTreeMap<String, f64>,
    /// Statistical power
    pub power: f64,
    /// Recommended sample size per group
    pub sample_size_recommendation: u64,
    /// Whether p < alpha
    pub is_significant: bool,
    /// Human-readable conclusion
    pub conclusion: String,
    /// Distribution series for plotting
    pub distribution_data: Vec<Value>,
    /// Bootstrap summary, when requested
    pub bootstrap_results: Option<Value>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Missing-cell summary in an EDA report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaMissing {
    /// Missing cells across the dataset
    pub total_missing: u64,
    /// Mean missing percentage
    pub total_pct: f64,
    /// Per-column details
    pub details: Vec<Value>,
}

/// Duplicate-row summary in an EDA report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaDuplicates {
    /// Duplicate rows
    pub count: u64,
    /// Duplicate percentage
    pub pct: f64,
    /// Sample duplicate rows
    pub sample: Vec<Value>,
}

/// Exploratory summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaResult {
    /// Shape
    pub shape: Shape,
    /// In-memory size
    pub memory_mb: f64,
    /// Missing cells
    pub missing: EdaMissing,
    /// Duplicate rows
    pub duplicates: EdaDuplicates,
    /// Per-column IQR outlier counts
    pub outliers: Vec<Value>,
    /// Numeric column statistics
    pub numeric_summary: Vec<Value>,
    /// Categorical column statistics
    pub categorical_summary: Vec<Value>,
    /// Storage type per column
    pub column_types: BTreeMap<String, String>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One data-quality issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisIssue {
    /// Issue family (standardization, semantic_outlier, pii, ...)
    #[serde(rename = "type")]
    pub issue_type: String,
    /// Affected column
    pub column: String,
    /// Description
    pub description: String,
    /// Suggested fix
    pub suggestion: String,
    /// high, medium or low
    pub severity: String,
}

/// Data-quality diagnosis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisResult {
    /// Issues found
    pub issues: Vec<DiagnosisIssue>,
    /// Issue count as reported
    pub total_issues: u64,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Frequency of one categorical value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueCount {
    /// Value as text
    pub value: String,
    /// Occurrences
    pub count: u64,
}

/// Summary of one column
///
/// Numeric columns carry the moments; categorical ones carry `unique` and
/// `top_values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSummary {
    /// Column name
    pub column: String,
    /// `numeric` or `categorical`
    #[serde(rename = "type")]
    pub column_type: String,
    /// Non-missing cells
    pub count: u64,
    /// Mean
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Standard deviation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    /// Minimum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Median
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    /// Distinct values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<u64>,
    /// Most frequent values, highest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<ValueCount>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Columns a forecast can use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastColumnsResult {
    /// Columns parseable as dates
    pub date_columns: Vec<String>,
    /// Numeric columns
    pub numeric_columns: Vec<String>,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of one analysis, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum AnalysisResult {
    /// Profile
    Profile(ProfileResult),
    /// Correlation
    Correlation(CorrelationResult),
    /// A/B test
    AbTest(AbTestResult),
    /// EDA
    Eda(EdaResult),
    /// AI diagnosis
    AiDiagnosis(DiagnosisResult),
    /// Column summary
    Describe(ColumnSummary),
    /// Forecastable columns
    ForecastColumns(ForecastColumnsResult),
    /// Kinds rendered straight from their JSON
    Other {
        /// Analysis kind
        kind: AnalysisKind,
        /// Raw body
        body: Value,
    },
}

impl AnalysisResult {
    /// Decode a response body for `kind`
    ///
    /// # Errors
    /// [`AnalysisError::Decode`] if a typed kind's body has the wrong shape.
    pub fn decode(kind: AnalysisKind, body: Value) -> Result<Self, AnalysisError> {
        fn typed<T: serde::de::DeserializeOwned>(
            kind: AnalysisKind,
            body: Value,
        ) -> Result<T, AnalysisError> {
            serde_json::from_value(body).map_err(|e| AnalysisError::Decode {
                kind,
                message: e.to_string(),
            })
        }

        Ok(match kind {
            AnalysisKind::Profile => Self::Profile(typed(kind, body)?),
            AnalysisKind::Correlation => Self::Correlation(typed(kind, body)?),
            AnalysisKind::AbTest => Self::AbTest(typed(kind, body)?),
            AnalysisKind::Eda => Self::Eda(typed(kind, body)?),
            AnalysisKind::AiDiagnosis => Self::AiDiagnosis(typed(kind, body)?),
            AnalysisKind::Describe => Self::Describe(typed(kind, body)?),
            AnalysisKind::ForecastColumns => Self::ForecastColumns(typed(kind, body)?),
            other => Self::Other { kind: other, body },
        })
    }

    /// Kind of this result
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Profile(_) => AnalysisKind::Profile,
            Self::Correlation(_) => AnalysisKind::Correlation,
            Self::AbTest(_) => AnalysisKind::AbTest,
            Self::Eda(_) => AnalysisKind::Eda,
            Self::AiDiagnosis(_) => AnalysisKind::AiDiagnosis,
            Self::Describe(_) => AnalysisKind::Describe,
            Self::ForecastColumns(_) => AnalysisKind::ForecastColumns,
            Self::Other { kind, .. } => *kind,
        }
    }

    /// JSON rendering of the payload
    #[must_use]
    pub fn to_value(&self) -> Value {
        let value = match self {
            Self::Profile(r) => serde_json::to_value(r),
            Self::Correlation(r) => serde_json::to_value(r),
            Self::AbTest(r) => serde_json::to_value(r),
            Self::Eda(r) => serde_json::to_value(r),
            Self::AiDiagnosis(r) => serde_json::to_value(r),
            Self::Describe(r) => serde_json::to_value(r),
            Self::ForecastColumns(r) => serde_json::to_value(r),
            Self::Other { body, .. } => return body.clone(),
        };
        value.unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_keeps_unmodelled_fields() {
        let body = json!({
            "file_id": "F0",
            "shape": { "rows": 100, "columns": 2 },
            "columns": [
                { "name": "age", "dtype": "int64", "missing": 0, "missing_pct": 0.0, "unique": 40, "mean": 31.5, "q1": 24.0, "skewness": 0.3 }
            ],
            "missing_summary": {},
            "warnings": ["duplicate rows: 3"]
        });
        let AnalysisResult::Profile(p) = AnalysisResult::decode(AnalysisKind::Profile, body).unwrap() else {
            panic!("expected profile");
        };
        assert_eq!(p.shape.rows, 100);
        assert_eq!(p.columns[0].unique_count, 40);
        assert_eq!(p.extra["file_id"], "F0");

        let rendered = AnalysisResult::Profile(p).to_value();
        let column = &rendered["columns"][0];
        assert_eq!(column["missing"], 0);
        assert_eq!(column["q1"], 24.0);
        assert_eq!(column["skewness"], 0.3);
    }

    #[test]
    fn diagnosis_issue_type_renamed() {
        let body = json!({
            "file_id": "F0",
            "issues": [{ "type": "pii", "column": "email", "description": "d", "suggestion": "s", "severity": "high" }],
            "total_issues": 1
        });
        let result = AnalysisResult::decode(AnalysisKind::AiDiagnosis, body).unwrap();
        assert_eq!(result.kind(), AnalysisKind::AiDiagnosis);
        let AnalysisResult::AiDiagnosis(d) = result else {
            panic!("expected diagnosis");
        };
        assert_eq!(d.issues[0].issue_type, "pii");
    }

    #[test]
    fn describe_numeric_and_categorical() {
        let numeric = json!({
            "column": "price", "type": "numeric", "count": 9,
            "mean": 4.5, "std": 1.2, "min": 1.0, "max": 9.0, "median": 4.0
        });
        let AnalysisResult::Describe(d) = AnalysisResult::decode(AnalysisKind::Describe, numeric).unwrap() else {
            panic!("expected describe");
        };
        assert_eq!(d.column_type, "numeric");
        assert_eq!(d.median, Some(4.0));
        assert!(d.top_values.is_empty());

        let categorical = json!({
            "column": "region", "type": "categorical", "count": 6, "unique": 2,
            "top_values": [{ "value": "north", "count": 4 }, { "value": "south", "count": 2 }]
        });
        let result = AnalysisResult::decode(AnalysisKind::Describe, categorical.clone()).unwrap();
        assert_eq!(result.to_value(), categorical);
    }

    #[test]
    fn forecast_columns_decode() {
        let body = json!({ "date_columns": ["day"], "numeric_columns": ["sales", "units"] });
        let result = AnalysisResult::decode(AnalysisKind::ForecastColumns, body).unwrap();
        assert_eq!(result.kind(), AnalysisKind::ForecastColumns);
        let AnalysisResult::ForecastColumns(f) = result else {
            panic!("expected forecast columns");
        };
        assert_eq!(f.numeric_columns, ["sales", "units"]);
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let err = AnalysisResult::decode(AnalysisKind::AbTest, json!({ "p_value": "low" })).unwrap_err();
        assert!(matches!(err, AnalysisError::Decode { kind: AnalysisKind::AbTest, .. }));
    }

    #[test]
    fn other_kinds_pass_through() {
        let body = json!({ "forecast": [1, 2, 3] });
        let result = AnalysisResult::decode(AnalysisKind::Forecast, body.clone()).unwrap();
        assert_eq!(result.to_value(), body);
    }
}
