//! Cache-backed analysis requests
//!
//! The engine is shared by every tab coordinator. It resolves the dataset
//! version through the ledger at call time, never from a captured id.

use crate::cache::{AnalysisCache, CacheEntry, FetchSource};
use crate::error::AnalysisError;
use crate::key::CacheKey;
use crate::params::AnalysisParams;
use crate::result::AnalysisResult;
use csl_client::AnalysisService;
use csl_lineage::{FileId, LineageStore};
use std::sync::Arc;
use tracing::{info, warn};

/// A served analysis
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Key the result is stored under
    pub key: CacheKey,
    /// Stored entry
    pub entry: Arc<CacheEntry>,
    /// Whether a remote call was issued, joined or skipped
    pub source: FetchSource,
}

impl AnalysisOutcome {
    /// The decoded result
    #[inline]
    #[must_use]
    pub fn result(&self) -> &AnalysisResult {
        &self.entry.result
    }
}

/// Issues analysis requests through the shared cache
#[derive(Clone)]
pub struct AnalysisEngine {
    service: Arc<dyn AnalysisService>,
    ledger: Arc<dyn LineageStore>,
    cache: AnalysisCache,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AnalysisEngine {
    /// Create an engine
    #[must_use]
    pub fn new(
        service: Arc<dyn AnalysisService>,
        ledger: Arc<dyn LineageStore>,
        cache: AnalysisCache,
    ) -> Self {
        Self {
            service,
            ledger,
            cache,
        }
    }

    /// Shared cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Ledger used to resolve the current version
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LineageStore> {
        &self.ledger
    }

    /// Key a request would be stored under
    ///
    /// # Errors
    /// [`AnalysisError::NoCurrentDataset`] if `file_id` is `None` and nothing
    /// has been uploaded.
    pub fn key_for(
        &self,
        params: &AnalysisParams,
        file_id: Option<FileId>,
    ) -> Result<CacheKey, AnalysisError> {
        let file_id = self.resolve(file_id)?;
        let normalized = params.normalized();
        Ok(CacheKey::new(normalized.kind(), file_id, normalized.signature()))
    }

    /// Run an analysis against `file_id`, or the current version when `None`
    ///
    /// Parameters are validated before anything else; an invalid request never
    /// reaches the service.
    ///
    /// # Errors
    /// - [`AnalysisError::Validation`] for missing or invalid parameters
    /// - [`AnalysisError::NoCurrentDataset`] if there is nothing to analyze
    /// - transport/decode failures (not cached)
    pub async fn run(
        &self,
        params: &AnalysisParams,
        file_id: Option<FileId>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let params = params.normalized();
        params.validate()?;
        let file_id = self.resolve(file_id)?;
        let kind = params.kind();
        let key = CacheKey::new(kind, file_id.clone(), params.signature());

        let service = Arc::clone(&self.service);
        let fetch = || async move {
            let (route, body) = params.request(&file_id);
            let value = service.analyze(&route, body.as_ref()).await?;
            AnalysisResult::decode(kind, value)
        };

        match self.cache.get_or_fetch(key.clone(), fetch).await {
            Ok(cached) => {
                if cached.source == FetchSource::Remote {
                    info!(%key, "analysis ready");
                }
                Ok(AnalysisOutcome {
                    key,
                    entry: cached.entry,
                    source: cached.source,
                })
            }
            Err(e) => {
                warn!(%key, error = %e, "analysis failed");
                Err(e)
            }
        }
    }

    fn resolve(&self, file_id: Option<FileId>) -> Result<FileId, AnalysisError> {
        file_id
            .or_else(|| self.ledger.current_file_id())
            .ok_or(AnalysisError::NoCurrentDataset)
    }
}
