//! Kind-specific analysis parameters
//!
//! [`AnalysisParams`] is a tagged union over [`AnalysisKind`]. Each variant
//! knows how to:
//! - validate itself locally (mandatory parameters bound, values in range)
//! - normalize itself (strings trimmed, set-like column lists sorted and deduplicated)
//! - produce a stable [`Signature`] over its normalized form
//! - address its endpoint for a given dataset version

use crate::error::ValidationError;
use crate::key::Signature;
use crate::kind::AnalysisKind;
use csl_client::Route;
use csl_lineage::FileId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn tidy(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn tidy_set(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = values
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn require<'a>(
    kind: AnalysisKind,
    param: &str,
    value: &'a Option<String>,
) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::missing(kind, param))
}

fn positive(kind: AnalysisKind, param: &str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::invalid(kind, param, "must be at least 1"));
    }
    Ok(())
}

// ── Enumerated options ──

/// Correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Linear
    #[default]
    Pearson,
    /// Rank
    Spearman,
    /// Concordance
    Kendall,
}

impl CorrelationMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
        }
    }
}

/// Two-sample test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbTestType {
    /// Student's t-test
    #[default]
    Ttest,
    /// Welch's t-test
    Welch,
    /// Mann-Whitney U
    Mannwhitney,
}

/// Resampling period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Period {
    /// Daily
    #[default]
    #[serde(rename = "D")]
    Daily,
    /// Weekly
    #[serde(rename = "W")]
    Weekly,
    /// Monthly
    #[serde(rename = "M")]
    Monthly,
    /// Quarterly
    #[serde(rename = "Q")]
    Quarterly,
}

/// Anomaly detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyMethod {
    /// Interquartile-range fence
    #[default]
    Iqr,
    /// Z-score threshold
    Zscore,
    /// Isolation forest
    Isolation,
}

/// Business KPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessMetric {
    /// Lifetime value
    Ltv,
    /// Acquisition cost
    Cac,
    /// Revenue per user
    Arpu,
    /// Churn rate
    Churn,
    /// Retention rate
    Retention,
    /// Conversion rate
    Conversion,
    /// Monthly recurring revenue
    Mrr,
    /// Cohort table
    Cohort,
}

impl BusinessMetric {
    /// Columns this metric cannot be computed without
    #[must_use]
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Ltv | Self::Arpu => &["revenue_column", "user_column"],
            Self::Cac => &["cost_column", "user_column"],
            Self::Churn | Self::Retention | Self::Cohort => &["user_column", "date_column"],
            Self::Conversion => &["event_column", "user_column"],
            Self::Mrr => &["revenue_column", "date_column"],
        }
    }
}

/// Chart family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Distribution of one numeric column
    Histogram,
    /// Two numeric columns
    Scatter,
    /// Category counts or aggregates
    Bar,
    /// Ordered series
    Line,
    /// Spread of one numeric column
    Boxplot,
}

impl ChartType {
    /// Columns this chart cannot be drawn without
    #[must_use]
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Histogram | Self::Bar => &["x_column"],
            Self::Scatter | Self::Line => &["x_column", "y_column"],
            Self::Boxplot => &["y_column"],
        }
    }
}

// ── Per-kind parameter sets ──

/// Correlation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorrelationParams {
    /// Coefficient
    pub method: CorrelationMethod,
}

/// A/B test parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbTestParams {
    /// Column holding the group label
    pub group_column: Option<String>,
    /// First group value
    pub group_a_value: Option<String>,
    /// Second group value
    pub group_b_value: Option<String>,
    /// Numeric outcome column
    pub metric_column: Option<String>,
    /// Significance level
    pub alpha: f64,
    /// Test family
    pub test_type: AbTestType,
    /// One-tailed test
    pub one_tailed: bool,
    /// Bootstrap resamples (0 disables)
    pub bootstrap_iterations: u32,
}

impl Default for AbTestParams {
    fn default() -> Self {
        Self {
            group_column: None,
            group_a_value: None,
            group_b_value: None,
            metric_column: None,
            alpha: 0.05,
            test_type: AbTestType::default(),
            one_tailed: false,
            bootstrap_iterations: 0,
        }
    }
}

/// Time-series parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeseriesParams {
    /// Date column
    pub date_column: Option<String>,
    /// Value column
    pub value_column: Option<String>,
    /// Resampling period
    pub period: Period,
    /// Periods to project
    pub forecast_periods: u32,
}

impl Default for TimeseriesParams {
    fn default() -> Self {
        Self {
            date_column: None,
            value_column: None,
            period: Period::Daily,
            forecast_periods: 7,
        }
    }
}

/// Segment comparison parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Column defining segments
    pub segment_column: Option<String>,
    /// Metrics to compare (empty means all numeric)
    pub metric_columns: Vec<String>,
    /// Segments to keep
    pub top_n: u32,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            segment_column: None,
            metric_columns: Vec::new(),
            top_n: 10,
        }
    }
}

/// Forecast parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParams {
    /// Date column
    pub date_column: Option<String>,
    /// Value column
    pub value_column: Option<String>,
    /// Horizon
    pub periods: u32,
    /// Frequency (daily, weekly or monthly)
    pub frequency: Period,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            date_column: None,
            value_column: None,
            periods: 30,
            frequency: Period::Daily,
        }
    }
}

/// What-if simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatifParams {
    /// Column to change
    pub column: Option<String>,
    /// Relative change in percent (10 means +10%)
    pub change_percent: f64,
    /// Column whose response is estimated
    pub target_column: Option<String>,
}

impl Default for WhatifParams {
    fn default() -> Self {
        Self {
            column: None,
            change_percent: 10.0,
            target_column: None,
        }
    }
}

/// Anomaly detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnomalyParams {
    /// Columns to scan (empty means all numeric)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Detector
    pub method: AnomalyMethod,
}

/// Business KPI parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessMetricsParams {
    /// KPI to compute
    pub metric_type: Option<BusinessMetric>,
    /// Revenue column
    pub revenue_column: Option<String>,
    /// Cost column
    pub cost_column: Option<String>,
    /// User id column
    pub user_column: Option<String>,
    /// Date column
    pub date_column: Option<String>,
    /// Event column
    pub event_column: Option<String>,
    /// Grouping column
    pub group_column: Option<String>,
    /// Aggregation period
    pub period: String,
}

impl Default for BusinessMetricsParams {
    fn default() -> Self {
        Self {
            metric_type: None,
            revenue_column: None,
            cost_column: None,
            user_column: None,
            date_column: None,
            event_column: None,
            group_column: None,
            period: "month".into(),
        }
    }
}

impl BusinessMetricsParams {
    fn column(&self, name: &str) -> &Option<String> {
        match name {
            "revenue_column" => &self.revenue_column,
            "cost_column" => &self.cost_column,
            "user_column" => &self.user_column,
            "date_column" => &self.date_column,
            "event_column" => &self.event_column,
            _ => &self.group_column,
        }
    }
}

/// Chart series parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDataParams {
    /// Chart family
    pub chart_type: Option<ChartType>,
    /// X column
    pub x_column: Option<String>,
    /// Y column
    pub y_column: Option<String>,
    /// Grouping column
    pub group_by: Option<String>,
    /// Histogram bins
    pub bins: u32,
}

impl Default for ChartDataParams {
    fn default() -> Self {
        Self {
            chart_type: None,
            x_column: None,
            y_column: None,
            group_by: None,
            bins: 20,
        }
    }
}

impl ChartDataParams {
    fn column(&self, name: &str) -> &Option<String> {
        if name == "x_column" {
            &self.x_column
        } else {
            &self.y_column
        }
    }
}

/// Generated insight parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiInsightsParams {
    /// Depth of analysis
    pub analysis_type: String,
    /// Topics to emphasize
    pub focus_areas: Vec<String>,
}

impl Default for AiInsightsParams {
    fn default() -> Self {
        Self {
            analysis_type: "comprehensive".into(),
            focus_areas: Vec::new(),
        }
    }
}

/// Column explanation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColumnExplainParams {
    /// Columns to explain (empty means all)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

/// Column value listing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnValuesParams {
    /// Column to list
    pub column: Option<String>,
    /// Maximum distinct values returned
    pub max_values: u32,
}

impl Default for ColumnValuesParams {
    fn default() -> Self {
        Self {
            column: None,
            max_values: 50,
        }
    }
}

/// Single-column summary parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DescribeParams {
    /// Column to summarize
    pub column: Option<String>,
}

// ── The union ──

/// Parameters for one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnalysisParams {
    /// Profile
    Profile,
    /// Correlation
    Correlation(CorrelationParams),
    /// A/B test
    AbTest(AbTestParams),
    /// Time series
    Timeseries(TimeseriesParams),
    /// Segment comparison
    Segment(SegmentParams),
    /// Forecast
    Forecast(ForecastParams),
    /// What-if simulation
    Whatif(WhatifParams),
    /// Anomaly detection
    Anomaly(AnomalyParams),
    /// Business KPI
    BusinessMetrics(BusinessMetricsParams),
    /// Chart series
    ChartData(ChartDataParams),
    /// Exploratory summary
    Eda,
    /// Generated insights
    AiInsights(AiInsightsParams),
    /// Generated column descriptions
    ColumnExplain(ColumnExplainParams),
    /// Generated data-quality diagnosis
    AiDiagnosis,
    /// Distinct values of a column
    ColumnValues(ColumnValuesParams),
    /// Summary statistics of a column
    Describe(DescribeParams),
    /// Forecastable columns
    ForecastColumns,
}

impl AnalysisParams {
    /// Default (possibly incomplete) parameters for a kind
    #[must_use]
    pub fn default_for(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::Profile => Self::Profile,
            AnalysisKind::Correlation => Self::Correlation(CorrelationParams::default()),
            AnalysisKind::AbTest => Self::AbTest(AbTestParams::default()),
            AnalysisKind::Timeseries => Self::Timeseries(TimeseriesParams::default()),
            AnalysisKind::Segment => Self::Segment(SegmentParams::default()),
            AnalysisKind::Forecast => Self::Forecast(ForecastParams::default()),
            AnalysisKind::Whatif => Self::Whatif(WhatifParams::default()),
            AnalysisKind::Anomaly => Self::Anomaly(AnomalyParams::default()),
            AnalysisKind::BusinessMetrics => {
                Self::BusinessMetrics(BusinessMetricsParams::default())
            }
            AnalysisKind::ChartData => Self::ChartData(ChartDataParams::default()),
            AnalysisKind::Eda => Self::Eda,
            AnalysisKind::AiInsights => Self::AiInsights(AiInsightsParams::default()),
            AnalysisKind::ColumnExplain => Self::ColumnExplain(ColumnExplainParams::default()),
            AnalysisKind::AiDiagnosis => Self::AiDiagnosis,
            AnalysisKind::ColumnValues => Self::ColumnValues(ColumnValuesParams::default()),
            AnalysisKind::Describe => Self::Describe(DescribeParams::default()),
            AnalysisKind::ForecastColumns => Self::ForecastColumns,
        }
    }

    /// Build parameters from textual `key=value` pairs over the kind's defaults
    ///
    /// Values are typed after the default they replace: numbers and booleans
    /// are parsed, list fields split on commas, everything else kept as text.
    ///
    /// # Errors
    /// [`ValidationError::InvalidParameter`] for unknown keys or unparseable values.
    pub fn from_pairs<K, V>(kind: AnalysisKind, pairs: &[(K, V)]) -> Result<Self, ValidationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields = match serde_json::to_value(Self::default_for(kind)) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let list_fields = list_fields(kind);

        for (key, raw) in pairs {
            let (key, raw) = (key.as_ref().trim(), raw.as_ref().trim());
            if key == "kind" {
                return Err(ValidationError::invalid(kind, key, "reserved"));
            }
            let current = match fields.get(key) {
                Some(v) => v.clone(),
                None if list_fields.contains(&key) => Value::Array(Vec::new()),
                None => return Err(ValidationError::invalid(kind, key, "unknown parameter")),
            };
            let typed = match current {
                Value::Number(_) => raw
                    .parse::<f64>()
                    .ok()
                    .and_then(|n| {
                        if n.fract() == 0.0 && n >= 0.0 {
                            raw.parse::<u64>().ok().map(Value::from).or(Some(Value::from(n)))
                        } else {
                            Some(Value::from(n))
                        }
                    })
                    .ok_or_else(|| ValidationError::invalid(kind, key, "expected a number"))?,
                Value::Bool(_) => raw
                    .parse::<bool>()
                    .map(Value::Bool)
                    .map_err(|_| ValidationError::invalid(kind, key, "expected true or false"))?,
                Value::Array(_) => Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                ),
                _ => Value::String(raw.to_string()),
            };
            fields.insert(key.to_string(), typed);
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ValidationError::invalid(kind, "params", e.to_string()))
    }

    /// The kind these parameters are for
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Profile => AnalysisKind::Profile,
            Self::Correlation(_) => AnalysisKind::Correlation,
            Self::AbTest(_) => AnalysisKind::AbTest,
            Self::Timeseries(_) => AnalysisKind::Timeseries,
            Self::Segment(_) => AnalysisKind::Segment,
            Self::Forecast(_) => AnalysisKind::Forecast,
            Self::Whatif(_) => AnalysisKind::Whatif,
            Self::Anomaly(_) => AnalysisKind::Anomaly,
            Self::BusinessMetrics(_) => AnalysisKind::BusinessMetrics,
            Self::ChartData(_) => AnalysisKind::ChartData,
            Self::Eda => AnalysisKind::Eda,
            Self::AiInsights(_) => AnalysisKind::AiInsights,
            Self::ColumnExplain(_) => AnalysisKind::ColumnExplain,
            Self::AiDiagnosis => AnalysisKind::AiDiagnosis,
            Self::ColumnValues(_) => AnalysisKind::ColumnValues,
            Self::Describe(_) => AnalysisKind::Describe,
            Self::ForecastColumns => AnalysisKind::ForecastColumns,
        }
    }

    /// Check that every mandatory parameter is bound and in range
    ///
    /// # Errors
    /// The first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        match self {
            Self::Profile
            | Self::Correlation(_)
            | Self::Eda
            | Self::AiDiagnosis
            | Self::Anomaly(_)
            | Self::AiInsights(_)
            | Self::ColumnExplain(_)
            | Self::ForecastColumns => Ok(()),
            Self::AbTest(p) => {
                let group = require(kind, "group_column", &p.group_column)?;
                let a = require(kind, "group_a_value", &p.group_a_value)?;
                let b = require(kind, "group_b_value", &p.group_b_value)?;
                let metric = require(kind, "metric_column", &p.metric_column)?;
                if a == b {
                    return Err(ValidationError::invalid(
                        kind,
                        "group_b_value",
                        "must differ from group_a_value",
                    ));
                }
                if group == metric {
                    return Err(ValidationError::invalid(
                        kind,
                        "metric_column",
                        "must differ from group_column",
                    ));
                }
                if !(p.alpha > 0.0 && p.alpha < 1.0) {
                    return Err(ValidationError::invalid(kind, "alpha", "must be in (0, 1)"));
                }
                Ok(())
            }
            Self::Timeseries(p) => {
                require(kind, "date_column", &p.date_column)?;
                require(kind, "value_column", &p.value_column)?;
                positive(kind, "forecast_periods", p.forecast_periods)
            }
            Self::Segment(p) => {
                require(kind, "segment_column", &p.segment_column)?;
                positive(kind, "top_n", p.top_n)
            }
            Self::Forecast(p) => {
                require(kind, "date_column", &p.date_column)?;
                require(kind, "value_column", &p.value_column)?;
                if p.frequency == Period::Quarterly {
                    return Err(ValidationError::invalid(
                        kind,
                        "frequency",
                        "must be D, W or M",
                    ));
                }
                positive(kind, "periods", p.periods)
            }
            Self::Whatif(p) => {
                require(kind, "column", &p.column)?;
                if !p.change_percent.is_finite() || p.change_percent <= -100.0 {
                    return Err(ValidationError::invalid(
                        kind,
                        "change_percent",
                        "must be a finite number above -100",
                    ));
                }
                Ok(())
            }
            Self::BusinessMetrics(p) => {
                let metric = p
                    .metric_type
                    .ok_or_else(|| ValidationError::missing(kind, "metric_type"))?;
                for column in metric.required_columns() {
                    require(kind, column, p.column(column))?;
                }
                Ok(())
            }
            Self::ChartData(p) => {
                let chart = p
                    .chart_type
                    .ok_or_else(|| ValidationError::missing(kind, "chart_type"))?;
                for column in chart.required_columns() {
                    require(kind, column, p.column(column))?;
                }
                positive(kind, "bins", p.bins)
            }
            Self::ColumnValues(p) => {
                require(kind, "column", &p.column)?;
                positive(kind, "max_values", p.max_values)
            }
            Self::Describe(p) => require(kind, "column", &p.column).map(|_| ()),
        }
    }

    /// Whether every mandatory parameter is bound
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    /// Canonical form: strings trimmed (blank becomes unbound), set-like
    /// lists sorted and deduplicated
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Profile
            | Self::Eda
            | Self::AiDiagnosis
            | Self::ForecastColumns
            | Self::Correlation(_) => self.clone(),
            Self::AbTest(p) => Self::AbTest(AbTestParams {
                group_column: tidy(&p.group_column),
                group_a_value: tidy(&p.group_a_value),
                group_b_value: tidy(&p.group_b_value),
                metric_column: tidy(&p.metric_column),
                ..p.clone()
            }),
            Self::Timeseries(p) => Self::Timeseries(TimeseriesParams {
                date_column: tidy(&p.date_column),
                value_column: tidy(&p.value_column),
                ..p.clone()
            }),
            Self::Segment(p) => Self::Segment(SegmentParams {
                segment_column: tidy(&p.segment_column),
                metric_columns: tidy_set(&p.metric_columns),
                top_n: p.top_n,
            }),
            Self::Forecast(p) => Self::Forecast(ForecastParams {
                date_column: tidy(&p.date_column),
                value_column: tidy(&p.value_column),
                ..p.clone()
            }),
            Self::Whatif(p) => Self::Whatif(WhatifParams {
                column: tidy(&p.column),
                target_column: tidy(&p.target_column),
                change_percent: p.change_percent,
            }),
            Self::Anomaly(p) => Self::Anomaly(AnomalyParams {
                columns: tidy_set(&p.columns),
                method: p.method,
            }),
            Self::BusinessMetrics(p) => Self::BusinessMetrics(BusinessMetricsParams {
                metric_type: p.metric_type,
                revenue_column: tidy(&p.revenue_column),
                cost_column: tidy(&p.cost_column),
                user_column: tidy(&p.user_column),
                date_column: tidy(&p.date_column),
                event_column: tidy(&p.event_column),
                group_column: tidy(&p.group_column),
                period: p.period.trim().to_string(),
            }),
            Self::ChartData(p) => Self::ChartData(ChartDataParams {
                x_column: tidy(&p.x_column),
                y_column: tidy(&p.y_column),
                group_by: tidy(&p.group_by),
                ..p.clone()
            }),
            Self::AiInsights(p) => Self::AiInsights(AiInsightsParams {
                analysis_type: p.analysis_type.trim().to_string(),
                focus_areas: tidy_set(&p.focus_areas),
            }),
            Self::ColumnExplain(p) => Self::ColumnExplain(ColumnExplainParams {
                columns: tidy_set(&p.columns),
            }),
            Self::ColumnValues(p) => Self::ColumnValues(ColumnValuesParams {
                column: tidy(&p.column),
                max_values: p.max_values,
            }),
            Self::Describe(p) => Self::Describe(DescribeParams {
                column: tidy(&p.column),
            }),
        }
    }

    /// Stable hash of the normalized parameters
    #[must_use]
    pub fn signature(&self) -> Signature {
        let canonical = serde_json::to_vec(&self.normalized()).unwrap_or_default();
        Signature::of(&canonical)
    }

    /// Endpoint and body for a request against `file_id`
    ///
    /// GET kinds carry the file id (and column) in the path; POST kinds carry
    /// it in the JSON body next to their own fields.
    #[must_use]
    pub fn request(&self, file_id: &FileId) -> (Route, Option<Value>) {
        let fid = urlencoding::encode(file_id.as_str());
        let route = match self {
            Self::Profile => return (Route::get(format!("analysis/profile/{fid}")), None),
            Self::Eda => return (Route::get(format!("analysis/eda/{fid}")), None),
            Self::ForecastColumns => {
                return (Route::get(format!("analysis/forecast/columns/{fid}")), None);
            }
            Self::Describe(p) => {
                let column = urlencoding::encode(p.column.as_deref().unwrap_or_default());
                return (Route::get(format!("analysis/describe/{fid}/{column}")), None);
            }
            Self::Correlation(p) => {
                let route = Route::get(format!("analysis/correlation/{fid}"))
                    .with_query("method", p.method.as_str());
                return (route, None);
            }
            Self::ColumnValues(p) => {
                let column = urlencoding::encode(p.column.as_deref().unwrap_or_default());
                let route = Route::get(format!("analysis/column-values/{fid}/{column}"))
                    .with_query("max_values", p.max_values.to_string());
                return (route, None);
            }
            Self::AbTest(_) => "analysis/ab-test",
            Self::Timeseries(_) => "analysis/timeseries",
            Self::Segment(_) => "analysis/segment",
            Self::Forecast(_) => "analysis/forecast",
            Self::Whatif(_) => "analysis/whatif",
            Self::Anomaly(_) => "analysis/anomaly",
            Self::BusinessMetrics(_) => "analysis/business-metrics",
            Self::ChartData(_) => "analysis/chart-data",
            Self::AiInsights(_) => "analysis/ai-insights",
            Self::ColumnExplain(_) => "analysis/column-explain",
            Self::AiDiagnosis => "analysis/ai-preprocess/diagnose",
        };

        let mut body = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        body.remove("kind");
        body.insert("file_id".into(), Value::String(file_id.to_string()));
        (Route::post(route), Some(Value::Object(body)))
    }
}

fn list_fields(kind: AnalysisKind) -> &'static [&'static str] {
    match kind {
        AnalysisKind::Segment => &["metric_columns"],
        AnalysisKind::Anomaly | AnalysisKind::ColumnExplain => &["columns"],
        AnalysisKind::AiInsights => &["focus_areas"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ab(group: &str, a: &str, b: &str, metric: &str) -> AnalysisParams {
        AnalysisParams::AbTest(AbTestParams {
            group_column: Some(group.into()),
            group_a_value: Some(a.into()),
            group_b_value: Some(b.into()),
            metric_column: Some(metric.into()),
            ..AbTestParams::default()
        })
    }

    #[test]
    fn ab_test_requires_all_four() {
        let incomplete = AnalysisParams::AbTest(AbTestParams {
            group_column: Some("variant".into()),
            metric_column: Some("revenue".into()),
            ..AbTestParams::default()
        });
        let err = incomplete.validate().unwrap_err();
        assert_eq!(err.param(), "group_a_value");

        assert!(ab("variant", "A", "B", "revenue").validate().is_ok());
        assert!(ab("variant", "A", "A", "revenue").validate().is_err());
        assert!(ab("variant", " ", "B", "revenue").validate().is_err());
    }

    #[test]
    fn chart_requirements() {
        let hist = AnalysisParams::ChartData(ChartDataParams {
            chart_type: Some(ChartType::Histogram),
            ..ChartDataParams::default()
        });
        assert_eq!(hist.validate().unwrap_err().param(), "x_column");

        let boxplot = AnalysisParams::ChartData(ChartDataParams {
            chart_type: Some(ChartType::Boxplot),
            y_column: Some("price".into()),
            ..ChartDataParams::default()
        });
        assert!(boxplot.validate().is_ok());

        let scatter = AnalysisParams::ChartData(ChartDataParams {
            chart_type: Some(ChartType::Scatter),
            x_column: Some("a".into()),
            ..ChartDataParams::default()
        });
        assert_eq!(scatter.validate().unwrap_err().param(), "y_column");
    }

    #[test]
    fn business_metric_requirements() {
        let params = |metric, revenue: Option<&str>, date: Option<&str>| {
            AnalysisParams::BusinessMetrics(BusinessMetricsParams {
                metric_type: Some(metric),
                revenue_column: revenue.map(Into::into),
                user_column: Some("user_id".into()),
                date_column: date.map(Into::into),
                ..BusinessMetricsParams::default()
            })
        };
        assert!(params(BusinessMetric::Ltv, Some("amount"), None).validate().is_ok());
        assert_eq!(
            params(BusinessMetric::Mrr, Some("amount"), None).validate().unwrap_err().param(),
            "date_column"
        );
        assert_eq!(
            params(BusinessMetric::Cac, None, None).validate().unwrap_err().param(),
            "cost_column"
        );
        assert!(params(BusinessMetric::Churn, None, Some("day")).validate().is_ok());
    }

    #[test]
    fn signature_ignores_whitespace_and_list_order() {
        let a = AnalysisParams::Segment(SegmentParams {
            segment_column: Some(" region ".into()),
            metric_columns: vec!["b".into(), "a".into(), "a".into()],
            top_n: 5,
        });
        let b = AnalysisParams::Segment(SegmentParams {
            segment_column: Some("region".into()),
            metric_columns: vec!["a".into(), "b".into()],
            top_n: 5,
        });
        assert_eq!(a.signature(), b.signature());

        let c = AnalysisParams::Segment(SegmentParams {
            top_n: 6,
            ..b.normalized().as_segment().clone()
        });
        assert_ne!(b.signature(), c.signature());
    }

    #[test]
    fn signature_differs_across_kinds() {
        assert_ne!(AnalysisParams::Profile.signature(), AnalysisParams::Eda.signature());
    }

    #[test]
    fn get_routes_address_file_in_path() {
        let (route, body) = AnalysisParams::Correlation(CorrelationParams {
            method: CorrelationMethod::Kendall,
        })
        .request(&FileId::new("F0"));
        assert_eq!(route.path, "analysis/correlation/F0");
        assert_eq!(route.query.get("method").map(String::as_str), Some("kendall"));
        assert!(body.is_none());

        let (route, _) = AnalysisParams::ColumnValues(ColumnValuesParams {
            column: Some("unit price".into()),
            max_values: 20,
        })
        .request(&FileId::new("F0"));
        assert_eq!(route.path, "analysis/column-values/F0/unit%20price");

        let (route, body) = AnalysisParams::Describe(DescribeParams {
            column: Some("price/unit".into()),
        })
        .request(&FileId::new("F 2"));
        assert_eq!(route.path, "analysis/describe/F%202/price%2Funit");
        assert!(body.is_none());

        let (route, _) = AnalysisParams::ForecastColumns.request(&FileId::new("F0"));
        assert_eq!(route.path, "analysis/forecast/columns/F0");
    }

    #[test]
    fn describe_requires_column() {
        let blank = AnalysisParams::Describe(DescribeParams {
            column: Some("  ".into()),
        });
        assert_eq!(blank.validate().unwrap_err().param(), "column");
        assert!(AnalysisParams::ForecastColumns.is_complete());
        let parsed = AnalysisParams::from_pairs(AnalysisKind::Describe, &[("column", "age")]).unwrap();
        assert!(parsed.is_complete());
    }

    #[test]
    fn post_body_carries_file_id() {
        let (route, body) = ab("variant", "A", "B", "revenue").request(&FileId::new("F1"));
        let body = body.unwrap();
        assert_eq!(route.path, "analysis/ab-test");
        assert_eq!(body["file_id"], "F1");
        assert_eq!(body["group_a_value"], "A");
        assert_eq!(body["test_type"], "ttest");
        assert!(body.get("kind").is_none());

        let (route, body) = AnalysisParams::AiDiagnosis.request(&FileId::new("F1"));
        assert_eq!(route.path, "analysis/ai-preprocess/diagnose");
        assert_eq!(body.unwrap(), serde_json::json!({ "file_id": "F1" }));
    }

    #[test]
    fn anomaly_omits_empty_columns() {
        let (_, body) = AnalysisParams::default_for(AnalysisKind::Anomaly).request(&FileId::new("F0"));
        let body = body.unwrap();
        assert!(body.get("columns").is_none());
        assert_eq!(body["method"], "iqr");
    }

    #[test]
    fn from_pairs_types_values() {
        let params = AnalysisParams::from_pairs(
            AnalysisKind::AbTest,
            &[
                ("group_column", "variant"),
                ("group_a_value", "1"),
                ("group_b_value", "2"),
                ("metric_column", "revenue"),
                ("alpha", "0.01"),
                ("one_tailed", "true"),
                ("bootstrap_iterations", "1000"),
            ],
        )
        .unwrap();
        let AnalysisParams::AbTest(p) = &params else {
            panic!("wrong kind");
        };
        assert_eq!(p.group_a_value.as_deref(), Some("1"));
        assert!((p.alpha - 0.01).abs() < f64::EPSILON);
        assert!(p.one_tailed);
        assert_eq!(p.bootstrap_iterations, 1000);
        assert!(params.validate().is_ok());

        let seg = AnalysisParams::from_pairs(
            AnalysisKind::Segment,
            &[("segment_column", "region"), ("metric_columns", "sales,profit")],
        )
        .unwrap();
        let AnalysisParams::Segment(p) = seg else {
            panic!("wrong kind");
        };
        assert_eq!(p.metric_columns, vec!["sales", "profit"]);

        let anomaly =
            AnalysisParams::from_pairs(AnalysisKind::Anomaly, &[("columns", "x")]).unwrap();
        assert!(matches!(anomaly, AnalysisParams::Anomaly(ref p) if p.columns == ["x"]));

        assert!(AnalysisParams::from_pairs(AnalysisKind::Profile, &[("bogus", "1")]).is_err());
        assert!(AnalysisParams::from_pairs(AnalysisKind::Segment, &[("top_n", "many")]).is_err());
    }

    impl AnalysisParams {
        fn as_segment(&self) -> &SegmentParams {
            match self {
                Self::Segment(p) => p,
                _ => panic!("not a segment"),
            }
        }
    }
}
