//! Docs Translator - translation job sync for documentation sites
//!
//! This library fingerprints documentation sources, submits translation job
//! plans to a remote translation service, polls jobs to completion and pulls
//! the resulting translations to disk.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod sync;

// Re-export key types for convenience
pub use crate::core::{
    client::{ApiClient, ApiClientConfig, ApiResponse, HttpTransport, RequestOptions},
    config::SyncConfig,
    errors::SyncError,
    models::{FileMetadata, JobPlanRequest, JobProgress, LocaleCode, PlanDiff},
    poller::{PollCancelHandle, PollOutcome, PollState, ProgressPoller, ProgressSink},
    service::TranslationService,
};

pub use crate::sync::orchestrator::{
    ExecutionReport, PlanReport, PullReport, TranslationOrchestrator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
