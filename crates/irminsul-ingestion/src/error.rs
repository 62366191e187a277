//! Error taxonomy for the ingestion core.
//!
//! Per-target errors (fetch, extract, most sync failures) are counted and the
//! run continues. Infrastructure errors (`is_fatal() == true`) abort the run.

use irminsul_common::EntityKind;
use thiserror::Error;

use crate::models::RunReport;

/// Why a single fetch attempt did not produce a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("host not allowed: {0}")]
    Blocked(String),

    #[error("invalid locator: {0}")]
    InvalidLocator(String),
}

impl FailureReason {
    /// Blocked hosts and malformed locators fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureReason::Blocked(_) | FailureReason::InvalidLocator(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// One attempt failed in a way another attempt might not.
    #[error("attempt {attempt} for {locator} failed: {reason}")]
    Transient {
        locator: String,
        attempt: u32,
        reason: FailureReason,
    },

    /// No further attempts will be made for this locator in this run.
    #[error("gave up on {locator} after {attempts} attempt(s): {last}")]
    Permanent {
        locator: String,
        attempts: u32,
        last: FailureReason,
    },
}

impl FetchError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::Permanent { .. })
    }

    pub fn reason(&self) -> &FailureReason {
        match self {
            FetchError::Transient { reason, .. } => reason,
            FetchError::Permanent { last, .. } => last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// The document does not look like a wiki article at all.
    #[error("unrecognised document at {locator}: {detail}")]
    Unrecognized { locator: String, detail: String },

    #[error("default rule for {kind}/{natural_key} field {field} does not fit: {detail}")]
    InvalidDefault {
        kind: EntityKind,
        natural_key: String,
        field: String,
        detail: String,
    },
}

/// Failures reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<irminsul_db::DbError> for StoreError {
    fn from(err: irminsul_db::DbError) -> Self {
        use irminsul_db::DbError;
        match err {
            DbError::Duplicate(msg) => StoreError::Conflict(msg),
            DbError::NotFound(msg) => StoreError::NotFound(msg),
            DbError::Corrupt(msg) | DbError::Arrow(msg) => StoreError::Corrupt(msg),
            DbError::Serialization(e) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("lookup of {kind}/{natural_key} failed: {source}")]
    Lookup {
        kind: EntityKind,
        natural_key: String,
        source: StoreError,
    },

    #[error("writing {kind}/{natural_key} failed: {source}")]
    Write {
        kind: EntityKind,
        natural_key: String,
        source: StoreError,
    },
}

impl SyncError {
    pub fn store_error(&self) -> &StoreError {
        match self {
            SyncError::Lookup { source, .. } | SyncError::Write { source, .. } => source,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.store_error().is_fatal()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbortReason {
    #[error("a {0} run is already in progress")]
    AlreadyRunning(EntityKind),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

/// A run that stopped early. `partial` covers every target finished before the abort.
#[derive(Debug, Clone, Error)]
#[error("run aborted: {reason}")]
pub struct RunAborted {
    pub reason: AbortReason,
    pub partial: RunReport,
}
