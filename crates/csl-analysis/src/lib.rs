//! Consilium analysis - cached analysis requests over versioned datasets
//!
//! Every analysis tab is a small state machine on top of one shared engine:
//! - [`AnalysisParams`] validates and normalizes kind-specific parameters
//! - [`AnalysisCache`] stores results per (kind, version, signature) and
//!   collapses concurrent identical requests into one remote call
//! - [`TabCoordinator`] drives `Idle → ParamsIncomplete → Requesting → Ready | Failed`
//! - [`CodeExecCoordinator`] handles AI code generation (cached) and
//!   execution (never cached, advances the ledger)
//!
//! # Example
//!
//! ```rust,ignore
//! use csl_analysis::{AnalysisCache, AnalysisEngine, AnalysisKind, TabCoordinator};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(AnalysisEngine::new(service, ledger, AnalysisCache::default()));
//! let tab = TabCoordinator::new(AnalysisKind::Correlation, engine);
//! let outcome = tab.request().await?;
//! println!("{}", outcome.result().to_value());
//! ```

pub mod cache;
pub mod code_exec;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod key;
pub mod kind;
pub mod params;
pub mod result;

pub use cache::{
    AnalysisCache, CacheEntry, CacheStats, CacheStatus, Cached, FetchSource, DEFAULT_MAX_CAPACITY,
};
pub use code_exec::{CodeExecCoordinator, ExecOutcome};
pub use coordinator::{
    allowed_transitions, validate_transition, IllegalTransition, TabCoordinator, TabPhase, TabView,
};
pub use engine::{AnalysisEngine, AnalysisOutcome};
pub use error::{AnalysisError, CodeExecError, ValidationError};
pub use key::{CacheKey, Signature};
pub use kind::{AnalysisKind, UnknownKind};
pub use params::AnalysisParams;
pub use result::{
    AbTestResult, AnalysisResult, ColumnSummary, CorrelationResult, DiagnosisResult, EdaResult,
    ForecastColumnsResult, ProfileResult,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
