//! Run orchestration.
//!
//! For one entity kind and a list of natural keys:
//!   1. Build targets (catalog default when no keys are given)
//!   2. Fetch each document through the shared, paced fetcher
//!   3. Extract a typed record and inject documented defaults
//!   4. Reconcile against the store
//!   5. Emit a progress event per target
//!
//! Per-target failures are counted and the run moves on. Only infrastructure
//! failures from the store stop a run early.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use irminsul_common::{EntityKind, HttpTransport, IrminsulError};
use irminsul_config::Config;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{AbortReason, RunAborted, SyncError};
use crate::extract;
use crate::fetcher::Fetcher;
use crate::models::{
    FailureStage, RunProgress, RunReport, ScrapeTarget, SyncAction, TargetFailure, TargetStatus,
};
use crate::rate_limit::RateLimiter;
use crate::repository::RecordStore;
use crate::status::StatusBoard;
use crate::sync::{SignificantFields, Synchronizer};

/// How one target ended inside a run.
enum TargetResult {
    Synced(SyncAction),
    Failed(TargetFailure),
    Fatal(SyncError),
    Cancelled,
}

pub struct ScrapeOrchestrator {
    fetcher: Arc<Fetcher>,
    synchronizer: Arc<Synchronizer>,
    catalog: Catalog,
    concurrency: usize,
    status: StatusBoard,
    progress_tx: Option<broadcast::Sender<RunProgress>>,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<Fetcher>,
        synchronizer: Arc<Synchronizer>,
        catalog: Catalog,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            synchronizer,
            catalog,
            concurrency: concurrency.max(1),
            status: StatusBoard::new(),
            progress_tx: None,
        }
    }

    /// Wires the full stack from configuration.
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, IrminsulError> {
        let limiter = Arc::new(RateLimiter::from_config(&config.scraper));
        let fetcher = Arc::new(Fetcher::new(transport, limiter, &config.scraper, &config.source));
        let significant = SignificantFields::with_overrides(&config.sync.significant_fields);
        let synchronizer = Arc::new(Synchronizer::new(store, significant));
        let catalog = Catalog::new(&config.source.base_url, config.catalog.clone())?;
        Ok(Self::new(fetcher, synchronizer, catalog, config.scraper.concurrency))
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<RunProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Shares a status board with other orchestrators or observers.
    pub fn with_status_board(mut self, status: StatusBoard) -> Self {
        self.status = status;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn status_board(&self) -> &StatusBoard {
        &self.status
    }

    /// Syncs `keys` (or the kind's catalog) and returns the run report.
    ///
    /// Cancelling `cancel` abandons in-flight fetches; writes already applied
    /// stay applied and the report covers completed targets only.
    #[instrument(skip(self, keys, cancel))]
    pub async fn run(
        &self,
        kind: EntityKind,
        keys: Option<Vec<String>>,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunAborted> {
        let run_id = Uuid::new_v4();
        let t0 = Instant::now();

        let ticket = self.status.try_begin(kind).map_err(|_| RunAborted {
            reason: AbortReason::AlreadyRunning(kind),
            partial: RunReport::empty(run_id, kind),
        })?;

        let targets = self.catalog.targets(kind, keys);
        info!(run_id = %run_id, %kind, targets = targets.len(), "Starting sync run");

        let counters_before = self.fetcher.counters();
        let mut report = RunReport::empty(run_id, kind);
        let mut abort = None;

        let mut results = stream::iter(targets)
            .map(|target| {
                let cancel = cancel.clone();
                async move {
                    let result = self.process(&target, &cancel).await;
                    (target.natural_key, result)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((natural_key, result)) = results.next().await {
            let stage = match result {
                TargetResult::Synced(action) => {
                    report.outcome.record(action);
                    TargetStatus::from(action)
                }
                TargetResult::Failed(failure) => {
                    report.outcome.record_error();
                    report.failures.push(failure);
                    TargetStatus::Failed
                }
                TargetResult::Fatal(err) => {
                    report.outcome.record_error();
                    report.failures.push(TargetFailure {
                        natural_key: natural_key.clone(),
                        stage: FailureStage::Sync,
                        message: err.to_string(),
                    });
                    abort = Some(AbortReason::Infrastructure(err.to_string()));
                    TargetStatus::Failed
                }
                TargetResult::Cancelled => {
                    report.cancelled = true;
                    TargetStatus::Cancelled
                }
            };
            self.emit(&report, natural_key, stage);

            if abort.is_some() {
                break;
            }
        }
        drop(results);

        report.attempted = report.outcome.total();
        report.fetch = self.fetcher.counters().since(&counters_before);
        report.duration_ms = t0.elapsed().as_millis() as u64;
        ticket.finish(&report);

        if let Some(reason) = abort {
            warn!(
                run_id = %run_id,
                %kind,
                %reason,
                completed = report.attempted,
                "Sync run aborted"
            );
            return Err(RunAborted { reason, partial: report });
        }

        info!(
            run_id      = %run_id,
            %kind,
            created     = report.outcome.created,
            updated     = report.outcome.updated,
            skipped     = report.outcome.skipped,
            errors      = report.outcome.errors,
            attempts    = report.fetch.attempts,
            cancelled   = report.cancelled,
            duration_ms = report.duration_ms,
            "Sync run complete"
        );
        Ok(report)
    }

    async fn process(&self, target: &ScrapeTarget, cancel: &CancellationToken) -> TargetResult {
        if cancel.is_cancelled() {
            return TargetResult::Cancelled;
        }
        let key = target.natural_key.as_str();

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TargetResult::Cancelled,
            res = self.fetcher.fetch(&target.locator, &[]) => res,
        };
        let doc = match fetched {
            Ok(doc) => doc,
            Err(e) => {
                warn!(natural_key = %key, error = %e, "Fetch failed");
                return TargetResult::Failed(failure(key, FailureStage::Fetch, e));
            }
        };

        let record = match extract::extract(target.kind, &doc, key) {
            Ok(record) => record,
            Err(e) => {
                warn!(natural_key = %key, error = %e, "Extraction failed");
                return TargetResult::Failed(failure(key, FailureStage::Extract, e));
            }
        };

        match self.synchronizer.reconcile(&record).await {
            Ok(action) => TargetResult::Synced(action),
            Err(e) if e.is_fatal() => TargetResult::Fatal(e),
            Err(e) => {
                warn!(natural_key = %key, error = %e, "Sync failed");
                TargetResult::Failed(failure(key, FailureStage::Sync, e))
            }
        }
    }

    fn emit(&self, report: &RunReport, natural_key: String, stage: TargetStatus) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(RunProgress {
                run_id: report.run_id,
                kind: report.kind,
                natural_key,
                stage,
                outcome_so_far: report.outcome,
            });
        }
    }
}

fn failure(natural_key: &str, stage: FailureStage, err: impl std::fmt::Display) -> TargetFailure {
    TargetFailure { natural_key: natural_key.to_string(), stage, message: err.to_string() }
}
