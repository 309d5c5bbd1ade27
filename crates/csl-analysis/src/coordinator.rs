//! Per-tab analysis state machine
//!
//! ```text
//! Idle ──► ParamsIncomplete ──► Requesting ──► Ready
//!   │             ▲                 │
//!   └─────────────┼─────────────────┴────────► Failed
//!                 └───────── dismiss / edit ◄────┘
//! ```
//!
//! A coordinator owns its parameters and its last visible result. Fetching
//! goes through the shared [`AnalysisEngine`], so two tabs asking for the
//! same key share one remote call.

use crate::cache::CacheEntry;
use crate::engine::{AnalysisEngine, AnalysisOutcome};
use crate::error::{AnalysisError, ValidationError};
use crate::kind::AnalysisKind;
use crate::params::AnalysisParams;
use csl_lineage::FileId;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabPhase {
    /// Nothing selected yet
    Idle,
    /// Parameters being edited (possibly incomplete)
    ParamsIncomplete,
    /// Remote call in flight
    Requesting,
    /// Result visible
    Ready,
    /// Error visible
    Failed,
}

/// Transition not in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal tab transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// Phase before
    pub from: TabPhase,
    /// Requested phase
    pub to: TabPhase,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: TabPhase) -> &'static [TabPhase] {
    use TabPhase::{Failed, Idle, ParamsIncomplete, Ready, Requesting};
    match from {
        Idle => &[ParamsIncomplete, Requesting],
        ParamsIncomplete => &[ParamsIncomplete, Requesting, Idle],
        Requesting => &[Requesting, Ready, Failed, ParamsIncomplete, Idle],
        Ready | Failed => &[ParamsIncomplete, Requesting, Idle],
    }
}

/// Check a transition against the table
///
/// # Errors
/// [`IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(from: TabPhase, to: TabPhase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Renderable snapshot of a coordinator
#[derive(Debug, Clone)]
pub struct TabView {
    /// Analysis kind
    pub kind: AnalysisKind,
    /// Phase
    pub phase: TabPhase,
    /// Current parameters
    pub params: AnalysisParams,
    /// Inline parameter problem, shown at the selection surface
    pub validation: Option<ValidationError>,
    /// Dismissable request error
    pub error: Option<AnalysisError>,
    /// Visible result
    pub result: Option<Arc<CacheEntry>>,
    /// Version the visible result was computed on
    pub file_id: Option<FileId>,
}

#[derive(Debug)]
struct TabInner {
    phase: TabPhase,
    params: AnalysisParams,
    validation: Option<ValidationError>,
    error: Option<AnalysisError>,
    result: Option<Arc<CacheEntry>>,
    file_id: Option<FileId>,
    generation: u64,
}

impl TabInner {
    fn fresh(kind: AnalysisKind) -> Self {
        Self {
            phase: TabPhase::Idle,
            params: AnalysisParams::default_for(kind),
            validation: None,
            error: None,
            result: None,
            file_id: None,
            generation: 0,
        }
    }

    fn advance(&mut self, to: TabPhase) {
        debug_assert!(
            validate_transition(self.phase, to).is_ok(),
            "illegal tab transition {:?} -> {:?}",
            self.phase,
            to
        );
        self.phase = to;
    }
}

/// State machine for one analysis tab
#[derive(Debug)]
pub struct TabCoordinator {
    kind: AnalysisKind,
    engine: Arc<AnalysisEngine>,
    inner: Mutex<TabInner>,
}

impl TabCoordinator {
    /// Create an idle coordinator with the kind's default parameters
    #[must_use]
    pub fn new(kind: AnalysisKind, engine: Arc<AnalysisEngine>) -> Self {
        Self {
            kind,
            engine,
            inner: Mutex::new(TabInner::fresh(kind)),
        }
    }

    /// Analysis kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> TabPhase {
        self.inner.lock().phase
    }

    /// Snapshot for rendering
    #[must_use]
    pub fn snapshot(&self) -> TabView {
        let inner = self.inner.lock();
        TabView {
            kind: self.kind,
            phase: inner.phase,
            params: inner.params.clone(),
            validation: inner.validation.clone(),
            error: inner.error.clone(),
            result: inner.result.clone(),
            file_id: inner.file_id.clone(),
        }
    }

    /// Replace the parameters and enter parameter selection
    ///
    /// Any request still in flight will no longer update this tab. Missing
    /// parameters are reported inline through [`TabView::validation`].
    ///
    /// # Errors
    /// [`ValidationError::InvalidParameter`] if `params` belong to another kind.
    pub fn set_params(&self, params: AnalysisParams) -> Result<TabPhase, ValidationError> {
        if params.kind() != self.kind {
            return Err(ValidationError::invalid(
                self.kind,
                "kind",
                format!("parameters are for {}", params.kind()),
            ));
        }
        let mut inner = self.inner.lock();
        inner.validation = params.normalized().validate().err();
        inner.params = params;
        inner.error = None;
        inner.generation += 1;
        inner.advance(TabPhase::ParamsIncomplete);
        Ok(inner.phase)
    }

    /// Request the analysis for the current dataset version
    ///
    /// # Errors
    /// See [`TabCoordinator::request_for`].
    pub async fn request(&self) -> Result<AnalysisOutcome, AnalysisError> {
        self.request_for(None).await
    }

    /// Request the analysis for `file_id`, or the current version when `None`
    ///
    /// Incomplete parameters keep the tab in `ParamsIncomplete` and never reach
    /// the service. If the parameters change or a newer request starts while
    /// this one is in flight, its result is still cached and returned but the
    /// tab keeps showing the newer state.
    ///
    /// # Errors
    /// Validation, missing-dataset, transport or decode failures.
    pub async fn request_for(
        &self,
        file_id: Option<FileId>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let (params, generation) = {
            let mut inner = self.inner.lock();
            let params = inner.params.clone();
            if let Err(e) = params.normalized().validate() {
                inner.validation = Some(e.clone());
                inner.advance(TabPhase::ParamsIncomplete);
                return Err(e.into());
            }
            inner.generation += 1;
            inner.validation = None;
            inner.error = None;
            inner.advance(TabPhase::Requesting);
            (params, inner.generation)
        };

        let outcome = self.engine.run(&params, file_id).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(kind = %self.kind, generation, "stale analysis response not shown");
            return outcome;
        }
        match &outcome {
            Ok(served) => {
                inner.result = Some(Arc::clone(&served.entry));
                inner.file_id = Some(served.key.file_id.clone());
                inner.advance(TabPhase::Ready);
            }
            Err(e) => {
                inner.error = Some(e.clone());
                inner.advance(TabPhase::Failed);
            }
        }
        outcome
    }

    /// Dismiss a visible error and return to parameter selection
    pub fn dismiss_error(&self) {
        let mut inner = self.inner.lock();
        if inner.phase == TabPhase::Failed {
            inner.error = None;
            inner.advance(TabPhase::ParamsIncomplete);
        }
    }

    /// Back to idle with default parameters
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.generation + 1;
        *inner = TabInner::fresh(self.kind);
        inner.generation = generation;
    }
}
