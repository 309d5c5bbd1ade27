//! Natural-language code generation and execution
//!
//! Two phases with different caching rules:
//! - `generate_code` is pure and cached per (version, instruction)
//! - `execute_code` creates a new dataset version on success; it is never
//!   cached and always targets the version current at call time

use crate::error::CodeExecError;
use csl_client::{AnalysisService, ClientError, CodeRequest, GeneratedCode};
use csl_lineage::{derived_metadata, DatasetVersion, FileId, LineageStore, Operation};
use moka::future::Cache;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Default number of cached generations
pub const DEFAULT_GENERATION_CAPACITY: u64 = 256;

/// Result of a successful execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    /// Newly registered (and now current) version
    pub version: DatasetVersion,
    /// Code that ran
    pub code: Option<String>,
    /// What the code does
    pub explanation: Option<String>,
    /// Change summary
    pub changes: Map<String, Value>,
}

/// Coordinates AI preprocessing against the ledger
#[derive(Clone)]
pub struct CodeExecCoordinator {
    service: Arc<dyn AnalysisService>,
    ledger: Arc<dyn LineageStore>,
    generated: Cache<(FileId, String), Arc<GeneratedCode>>,
}

impl std::fmt::Debug for CodeExecCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeExecCoordinator")
            .field("cached_generations", &self.generated.entry_count())
            .finish_non_exhaustive()
    }
}

fn instruction_text(instruction: &str) -> Result<String, CodeExecError> {
    let text = instruction.trim();
    if text.is_empty() {
        return Err(CodeExecError::EmptyInstruction);
    }
    Ok(text.to_string())
}

impl CodeExecCoordinator {
    /// Create a coordinator
    #[must_use]
    pub fn new(service: Arc<dyn AnalysisService>, ledger: Arc<dyn LineageStore>) -> Self {
        Self::with_capacity(service, ledger, DEFAULT_GENERATION_CAPACITY)
    }

    /// Create a coordinator caching at most `capacity` generations
    #[must_use]
    pub fn with_capacity(
        service: Arc<dyn AnalysisService>,
        ledger: Arc<dyn LineageStore>,
        capacity: u64,
    ) -> Self {
        Self {
            service,
            ledger,
            generated: Cache::new(capacity),
        }
    }

    fn resolve(&self, file_id: Option<FileId>) -> Result<FileId, CodeExecError> {
        file_id
            .or_else(|| self.ledger.current_file_id())
            .ok_or(CodeExecError::NoCurrentDataset)
    }

    /// Generate code for `instruction` against `file_id` (or the current version)
    ///
    /// Identical instructions for the same version are served from cache;
    /// concurrent identical requests share one call.
    ///
    /// # Errors
    /// - [`CodeExecError::EmptyInstruction`] / [`CodeExecError::NoCurrentDataset`]
    /// - [`CodeExecError::Domain`] if the generator reports failure
    /// - transport failures
    pub async fn generate_code(
        &self,
        instruction: &str,
        file_id: Option<FileId>,
    ) -> Result<Arc<GeneratedCode>, CodeExecError> {
        let text = instruction_text(instruction)?;
        let file_id = self.resolve(file_id)?;
        let request = CodeRequest {
            file_id: file_id.to_string(),
            instruction: text.clone(),
            context: None,
        };

        let service = Arc::clone(&self.service);
        let init = async move {
            let generated = service.generate_code(&request).await?;
            if !generated.success {
                let message = if generated.explanation.is_empty() {
                    "code generation failed".to_string()
                } else {
                    generated.explanation.clone()
                };
                return Err(CodeExecError::Domain {
                    message,
                    code: Some(generated.code).filter(|c| !c.is_empty()),
                });
            }
            Ok(Arc::new(generated))
        };

        self.generated
            .try_get_with((file_id.clone(), text), init)
            .await
            .map_err(|e| {
                warn!(%file_id, error = %e, "code generation failed");
                (*e).clone()
            })
    }

    /// Execute `instruction` against the current version
    ///
    /// On success the new version is registered as a derivation of the
    /// version that was current when the call started, and becomes current.
    /// On any failure the ledger is untouched.
    ///
    /// # Errors
    /// - [`CodeExecError::EmptyInstruction`] / [`CodeExecError::NoCurrentDataset`]
    /// - [`CodeExecError::Domain`] carrying the rejected code, if any
    /// - transport or lineage failures
    pub async fn execute_code(&self, instruction: &str) -> Result<ExecOutcome, CodeExecError> {
        let text = instruction_text(instruction)?;
        let parent = self.resolve(None)?;
        let request = CodeRequest {
            file_id: parent.to_string(),
            instruction: text,
            context: None,
        };

        let resp = self.service.execute_code(&request).await.map_err(|e| {
            warn!(%parent, error = %e, "code execution failed");
            e
        })?;
        if !resp.success {
            let message = resp
                .error
                .unwrap_or_else(|| "execution was rejected".to_string());
            warn!(%parent, %message, "code execution rejected");
            return Err(CodeExecError::Domain {
                message,
                code: resp.code,
            });
        }
        let new_file_id = resp
            .new_file_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CodeExecError::Client(ClientError::Decode(
                    "execute-code succeeded without new_file_id".to_string(),
                ))
            })?;

        let metadata = derived_metadata(self.ledger.get(&parent).as_ref(), &resp.changes);
        let version = self.ledger.register_derivation(
            &parent,
            Operation::NlCodeExec,
            FileId::new(new_file_id),
            metadata,
        )?;
        info!(%parent, file_id = %version.file_id, "generated code applied");

        Ok(ExecOutcome {
            version,
            code: resp.code,
            explanation: resp.explanation,
            changes: resp.changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_lineage::{Ledger, LineageError, VersionMetadata};
    use csl_test_utils::{fixtures, MockService};

    fn setup() -> (Arc<MockService>, Arc<Ledger>, CodeExecCoordinator) {
        let svc = MockService::shared();
        let ledger = Arc::new(Ledger::new());
        ledger
            .register_upload(FileId::new("F1"), VersionMetadata::shape(100, 3))
            .unwrap();
        let exec = CodeExecCoordinator::new(svc.clone(), ledger.clone());
        (svc, ledger, exec)
    }

    #[tokio::test]
    async fn generation_is_cached_per_version_and_instruction() {
        let (svc, _ledger, exec) = setup();
        let first = exec.generate_code("fill missing with mean", None).await.unwrap();
        let again = exec.generate_code("  fill missing with mean ", None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(svc.calls("generate-code"), 1);

        exec.generate_code("drop duplicates", None).await.unwrap();
        assert_eq!(svc.calls("generate-code"), 2);
    }

    #[tokio::test]
    async fn generation_failure_is_domain_and_not_cached() {
        let (svc, _ledger, exec) = setup();
        let mut failed = fixtures::generated_code("");
        failed.success = false;
        failed.explanation = "could not understand".into();
        svc.push_generate(Ok(failed));

        let err = exec.generate_code("???", None).await.unwrap_err();
        assert_eq!(
            err,
            CodeExecError::Domain {
                message: "could not understand".into(),
                code: None
            }
        );
        assert!(exec.generate_code("???", None).await.is_ok());
        assert_eq!(svc.calls("generate-code"), 2);
    }

    #[tokio::test]
    async fn repeated_execution_is_a_fresh_operation() {
        let (svc, ledger, exec) = setup();
        svc.push_file_ids(["F2", "F3"]);

        let first = exec.execute_code("fill missing with mean").await.unwrap();
        assert_eq!(first.version.file_id.as_str(), "F2");
        assert_eq!(first.version.parent_file_id, Some(FileId::new("F1")));

        let second = exec.execute_code("fill missing with mean").await.unwrap();
        assert_eq!(second.version.file_id.as_str(), "F3");
        assert_eq!(second.version.parent_file_id, Some(FileId::new("F2")));
        assert_eq!(ledger.current_file_id(), Some(FileId::new("F3")));
        assert_eq!(svc.calls("execute-code"), 2);
        assert_eq!(svc.requests("execute-code")[1]["file_id"], "F2");
    }

    #[tokio::test]
    async fn rejected_execution_keeps_ledger() {
        let (svc, ledger, exec) = setup();
        svc.push_execute(Ok(fixtures::execute_failure(
            "blocked keyword: import os",
            Some("import os"),
        )));

        let err = exec.execute_code("delete my files").await.unwrap_err();
        let CodeExecError::Domain { code, .. } = err else {
            panic!("expected domain error");
        };
        assert_eq!(code.as_deref(), Some("import os"));
        assert_eq!(ledger.current_file_id(), Some(FileId::new("F1")));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn reused_id_is_lineage_error() {
        let (svc, ledger, exec) = setup();
        svc.push_execute(Ok(fixtures::execute_success("F1", 100, 90)));
        let err = exec.execute_code("drop nulls").await.unwrap_err();
        assert_eq!(
            err,
            CodeExecError::Lineage(LineageError::DuplicateVersion(FileId::new("F1")))
        );
        assert_eq!(ledger.current_file_id(), Some(FileId::new("F1")));
    }

    #[tokio::test]
    async fn empty_instruction_never_calls() {
        let (svc, _ledger, exec) = setup();
        assert_eq!(
            exec.execute_code("   ").await.unwrap_err(),
            CodeExecError::EmptyInstruction
        );
        assert_eq!(svc.total_calls(), 0);
    }
}
