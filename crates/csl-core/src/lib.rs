//! Consilium - multi-agent conversations and versioned dataset analysis
//!
//! The facade over the workspace:
//! - [`ConsiliumConfig`] loaded from TOML with environment overrides
//! - [`Consilium`] wiring the conversation manager, dataset ledger, analysis
//!   engine and code-execution coordinator to one service
//! - [`ConsiliumError`] with a user-facing [`ErrorCategory`]
//! - [`telemetry::init_tracing`] for binaries
//!
//! # Example
//!
//! ```rust,ignore
//! use csl_core::prelude::*;
//!
//! # async fn example() -> Result<(), ConsiliumError> {
//! let app = Consilium::connect(ConsiliumConfig::from_env())?;
//! app.upload("sales.csv", b"region,revenue\nnorth,120\n".to_vec()).await?;
//! let eda = app.analyze(&AnalysisParams::default_for(AnalysisKind::Eda), None).await?;
//! println!("{}", eda.result().to_value());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consilium;
pub mod error;
pub mod telemetry;

pub use config::{
    CacheConfig, ConfigError, ConsiliumConfig, ServiceConfig, SessionConfig, BASE_URL_ENV,
    DEFAULT_BASE_URL,
};
pub use consilium::Consilium;
pub use error::{ConsiliumError, ErrorCategory};

pub use csl_analysis as analysis;
pub use csl_client as client;
pub use csl_lineage as lineage;
pub use csl_session as session;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Consilium
    pub use crate::{Consilium, ConsiliumConfig, ConsiliumError, ErrorCategory};
    pub use csl_analysis::{AnalysisKind, AnalysisParams, AnalysisResult, TabPhase};
    pub use csl_lineage::{FileId, LineageStore, Preprocess};
    pub use csl_session::{AgentName, Restore, SessionResetPolicy, Submission};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
