//! Consilium client - remote service boundary
//!
//! The leaf of the workspace:
//! - Wire types for chat, session history, the agent roster, upload,
//!   preprocessing, code generation and analysis
//! - The [`AnalysisService`] trait every higher layer is written against
//! - [`HttpAnalysisService`], the reqwest implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use csl_client::{AnalysisService, ChatRequest, HttpAnalysisService};
//!
//! # async fn example() -> Result<(), csl_client::ClientError> {
//! let svc = HttpAnalysisService::new("http://localhost:8001/api")?;
//! let resp = svc.chat(&ChatRequest::new("What is our churn risk?")).await?;
//! println!("{} ({:.0}%)", resp.answer, resp.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod service;
pub mod wire;

pub use error::ClientError;
pub use http::{HttpAnalysisService, DEFAULT_TIMEOUT};
pub use service::AnalysisService;
pub use wire::{
    AgentInfo, AgentList, AgentStatusReport, AgentStepDto, ChatRequest, ChatResponse, CodeRequest,
    ColumnProfile, ExecuteCodeResponse, GeneratedCode, HistoryMessage, PreprocessKind,
    PreprocessRequest, PreprocessResponse, Route, SessionHistory, SessionInfo, SessionList,
    UploadResponse, Verb, Visualization,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
