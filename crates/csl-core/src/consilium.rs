//! The Consilium facade
//!
//! Owns one of each component and wires them to a shared service and ledger:
//! - Conversation manager for multi-agent chat, session history and the agent roster
//! - Dataset transformer for upload and preprocessing
//! - Analysis engine with one tab coordinator per kind
//! - AI code-execution coordinator

use crate::config::ConsiliumConfig;
use crate::error::ConsiliumError;
use csl_analysis::{
    AnalysisCache, AnalysisEngine, AnalysisKind, AnalysisOutcome, AnalysisParams,
    CodeExecCoordinator, ExecOutcome, TabCoordinator,
};
use csl_client::{
    AgentInfo, AgentStatusReport, AnalysisService, GeneratedCode, HttpAnalysisService, SessionInfo,
};
use csl_lineage::{
    DatasetTransformer, DatasetVersion, FileId, Ledger, LineageStore, Preprocess, TransformOutcome,
};
use csl_session::{AgentName, ConversationManager, Restore, SessionState, Submission};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Client-side state for one user: conversation, dataset lineage and analyses
pub struct Consilium {
    config: ConsiliumConfig,
    ledger: Arc<Ledger>,
    session: ConversationManager,
    transformer: DatasetTransformer,
    engine: Arc<AnalysisEngine>,
    code_exec: CodeExecCoordinator,
    tabs: DashMap<AnalysisKind, Arc<TabCoordinator>>,
}

impl std::fmt::Debug for Consilium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consilium")
            .field("base_url", &self.config.service.base_url)
            .field("current", &self.ledger.current_file_id())
            .finish_non_exhaustive()
    }
}

impl Consilium {
    /// Connect to the configured HTTP service
    ///
    /// # Errors
    /// [`ConsiliumError::Client`] if the HTTP client cannot be built.
    pub fn connect(config: ConsiliumConfig) -> Result<Self, ConsiliumError> {
        let service = HttpAnalysisService::with_options(
            config.service.base_url.clone(),
            config.service.timeout(),
            config.service.user_agent.as_deref(),
        )?;
        tracing::info!(base_url = service.base_url(), "connected to analysis service");
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// Build on an arbitrary service implementation
    #[must_use]
    pub fn with_service(config: ConsiliumConfig, service: Arc<dyn AnalysisService>) -> Self {
        let ledger = Arc::new(Ledger::new());
        let store: Arc<dyn LineageStore> = ledger.clone();
        let cache = match config.cache.ttl_secs {
            Some(secs) => AnalysisCache::with_ttl(config.cache.max_capacity, Duration::from_secs(secs)),
            None => AnalysisCache::new(config.cache.max_capacity),
        };
        Self {
            session: ConversationManager::with_reset_policy(
                Arc::clone(&service),
                config.session.reset_policy,
            ),
            transformer: DatasetTransformer::new(Arc::clone(&service), Arc::clone(&store)),
            engine: Arc::new(AnalysisEngine::new(
                Arc::clone(&service),
                Arc::clone(&store),
                cache,
            )),
            code_exec: CodeExecCoordinator::new(service, store),
            tabs: DashMap::new(),
            ledger,
            config,
        }
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsiliumConfig {
        &self.config
    }

    /// Dataset ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Conversation manager
    #[inline]
    #[must_use]
    pub fn session(&self) -> &ConversationManager {
        &self.session
    }

    /// Analysis engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<AnalysisEngine> {
        &self.engine
    }

    /// Code-execution coordinator
    #[inline]
    #[must_use]
    pub fn code_exec(&self) -> &CodeExecCoordinator {
        &self.code_exec
    }

    /// The coordinator for `kind`, created on first use
    #[must_use]
    pub fn tab(&self, kind: AnalysisKind) -> Arc<TabCoordinator> {
        self.tabs
            .entry(kind)
            .or_insert_with(|| Arc::new(TabCoordinator::new(kind, Arc::clone(&self.engine))))
            .clone()
    }

    // ── Conversation ──

    /// Submit a query to the agent panel
    pub async fn ask(&self, query: &str) -> Submission {
        self.session.submit_query(query).await
    }

    /// Copy of the conversation state
    #[must_use]
    pub fn conversation(&self) -> SessionState {
        self.session.snapshot()
    }

    /// Clear the visible conversation
    pub fn reset_conversation(&self) {
        self.session.reset();
    }

    /// Conversations stored by the service
    ///
    /// # Errors
    /// Transport failures.
    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, ConsiliumError> {
        Ok(self.session.list_sessions().await?)
    }

    /// Resume a stored conversation
    pub async fn restore_session(&self, session_id: &str) -> Restore {
        self.session.restore(session_id).await
    }

    /// Delete a stored conversation
    ///
    /// # Errors
    /// Transport failures, including unknown ids.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ConsiliumError> {
        Ok(self.session.delete_session(session_id).await?)
    }

    /// Refresh and return the agent roster
    ///
    /// # Errors
    /// Transport failures.
    pub async fn agents(&self) -> Result<Vec<AgentInfo>, ConsiliumError> {
        Ok(self.session.refresh_agents().await?)
    }

    /// Service-side run state of one agent
    ///
    /// # Errors
    /// Transport failures, including unknown agents.
    pub async fn agent_report(&self, agent: &AgentName) -> Result<AgentStatusReport, ConsiliumError> {
        Ok(self.session.agent_report(agent).await?)
    }

    // ── Datasets ──

    /// The working dataset version
    #[must_use]
    pub fn current_file_id(&self) -> Option<FileId> {
        self.ledger.current_file_id()
    }

    /// Lineage of the working dataset, newest first
    ///
    /// # Errors
    /// Never in practice; the current version is always registered.
    pub fn lineage(&self) -> Result<Vec<DatasetVersion>, ConsiliumError> {
        match self.ledger.current_file_id() {
            Some(current) => Ok(self.ledger.lineage(&current)?),
            None => Ok(Vec::new()),
        }
    }

    /// Upload a file as a new root version
    ///
    /// # Errors
    /// Transport or lineage failures.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<DatasetVersion, ConsiliumError> {
        let version = self.transformer.upload(filename, bytes).await?;
        self.after_advance(&version.file_id).await;
        Ok(version)
    }

    /// Apply a preprocessing step to the working dataset
    ///
    /// # Errors
    /// Validation, transport, domain or lineage failures; the working dataset
    /// is unchanged on error.
    pub async fn preprocess(&self, step: &Preprocess) -> Result<TransformOutcome, ConsiliumError> {
        let outcome = self.transformer.preprocess(step).await?;
        self.after_advance(&outcome.version.file_id).await;
        Ok(outcome)
    }

    // ── Analysis ──

    /// Run an analysis against `file_id`, or the working dataset when `None`
    ///
    /// # Errors
    /// Validation, transport or decode failures.
    pub async fn analyze(
        &self,
        params: &AnalysisParams,
        file_id: Option<FileId>,
    ) -> Result<AnalysisOutcome, ConsiliumError> {
        Ok(self.engine.run(params, file_id).await?)
    }

    /// Generate code for a natural-language instruction
    ///
    /// # Errors
    /// Validation, transport or domain failures.
    pub async fn generate_code(
        &self,
        instruction: &str,
        file_id: Option<FileId>,
    ) -> Result<Arc<GeneratedCode>, ConsiliumError> {
        Ok(self.code_exec.generate_code(instruction, file_id).await?)
    }

    /// Execute a natural-language instruction against the working dataset
    ///
    /// # Errors
    /// Validation, transport, domain or lineage failures; the working dataset
    /// is unchanged on error.
    pub async fn execute_code(&self, instruction: &str) -> Result<ExecOutcome, ConsiliumError> {
        let outcome = self.code_exec.execute_code(instruction).await?;
        self.after_advance(&outcome.version.file_id).await;
        Ok(outcome)
    }

    async fn after_advance(&self, current: &FileId) {
        if self.config.cache.evict_superseded_versions {
            self.engine.cache().evict_superseded(current).await;
        }
    }
}
