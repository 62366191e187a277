//! Data models for the ingestion pipeline.

use irminsul_common::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entity to fetch in a run. Built from a caller-supplied key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub kind: EntityKind,
    pub natural_key: String,
    pub locator: String,
}

/// A fetched page body. Never persisted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub locator: String,
    pub body: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

/// What the synchronizer did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Skipped,
}

/// Per-run accumulator.
///
/// `created + updated + skipped + errors` always equals the number of targets
/// attempted in the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl SyncOutcome {
    pub fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Created => self.created += 1,
            SyncAction::Updated => self.updated += 1,
            SyncAction::Skipped => self.skipped += 1,
        }
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn total(&self) -> u64 {
        self.created + self.updated + self.skipped + self.errors
    }
}

/// Fetcher counters, as a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchCounters {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Percentage of attempts that returned a document. 0.0 with no attempts.
    pub success_rate: f64,
}

impl FetchCounters {
    pub fn new(attempts: u64, successes: u64, failures: u64) -> Self {
        let success_rate = if attempts == 0 {
            0.0
        } else {
            successes as f64 / attempts as f64 * 100.0
        };
        Self { attempts, successes, failures, success_rate }
    }

    /// Counters accumulated since an earlier snapshot.
    pub fn since(&self, earlier: &FetchCounters) -> FetchCounters {
        FetchCounters::new(
            self.attempts.saturating_sub(earlier.attempts),
            self.successes.saturating_sub(earlier.successes),
            self.failures.saturating_sub(earlier.failures),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Extract,
    Sync,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFailure {
    pub natural_key: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Result summary for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub kind: EntityKind,
    pub attempted: u64,
    pub outcome: SyncOutcome,
    pub fetch: FetchCounters,
    pub failures: Vec<TargetFailure>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn empty(run_id: Uuid, kind: EntityKind) -> Self {
        Self {
            run_id,
            kind,
            attempted: 0,
            outcome: SyncOutcome::default(),
            fetch: FetchCounters::default(),
            failures: Vec::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }
}

/// How one target ended, as reported on the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Created,
    Updated,
    Skipped,
    Failed,
    Cancelled,
}

impl From<SyncAction> for TargetStatus {
    fn from(action: SyncAction) -> Self {
        match action {
            SyncAction::Created => TargetStatus::Created,
            SyncAction::Updated => TargetStatus::Updated,
            SyncAction::Skipped => TargetStatus::Skipped,
        }
    }
}

/// Progress event emitted after each target (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    pub run_id: Uuid,
    pub kind: EntityKind,
    pub natural_key: String,
    pub stage: TargetStatus,
    pub outcome_so_far: SyncOutcome,
}
