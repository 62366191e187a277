//! irminsul-ingestion: fetch → extract → reconcile.
//! - Paced, retrying document fetcher with identity rotation
//! - Per-kind extractors over wiki page templates
//! - Vocabulary normalisation and default-value injection
//! - Incremental synchronizer with per-kind significant fields
//! - Run orchestration, default catalogs, status board

pub mod catalog;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod record;
pub mod repository;
pub mod status;
pub mod sync;

pub use catalog::{Catalog, CATALOG_VERSION};
pub use error::{AbortReason, ExtractError, FailureReason, FetchError, RunAborted, StoreError, SyncError};
pub use fetcher::{Fetcher, RetryPolicy};
pub use models::{
    FailureStage, FetchCounters, RawDocument, RunProgress, RunReport, ScrapeTarget, SyncAction,
    SyncOutcome, TargetFailure, TargetStatus,
};
pub use pipeline::ScrapeOrchestrator;
pub use rate_limit::RateLimiter;
pub use record::{Attributes, ExtractedRecord};
pub use repository::{LanceRecordStore, MemoryRecordStore, PersistedRecord, RecordStore};
pub use status::{AlreadyRunning, KindStatus, RunTicket, StatusBoard};
pub use sync::{SignificantFields, Synchronizer};
