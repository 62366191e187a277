//! Per-kind run status.
//!
//! At most one run per entity kind is in flight. Holding a [`RunTicket`] is
//! what marks a kind as running; dropping it releases the kind even if the
//! run never called [`RunTicket::finish`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use irminsul_common::EntityKind;
use serde::Serialize;
use thiserror::Error;

use crate::models::RunReport;

#[derive(Debug, Clone, Default, Serialize)]
pub struct KindStatus {
    pub is_running: bool,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub last_report: Option<RunReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a {0} run is already in progress")]
pub struct AlreadyRunning(pub EntityKind);

#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<HashMap<EntityKind, KindStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kind` as running, or refuses if it already is.
    pub fn try_begin(&self, kind: EntityKind) -> Result<RunTicket, AlreadyRunning> {
        let mut map = self.lock();
        let status = map.entry(kind).or_default();
        if status.is_running {
            return Err(AlreadyRunning(kind));
        }
        status.is_running = true;
        status.last_started = Some(Utc::now());
        Ok(RunTicket { board: self.clone(), kind, released: false })
    }

    pub fn status(&self, kind: EntityKind) -> KindStatus {
        self.lock().get(&kind).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<(EntityKind, KindStatus)> {
        let map = self.lock();
        EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, map.get(&kind).cloned().unwrap_or_default()))
            .collect()
    }

    fn release(&self, kind: EntityKind, report: Option<RunReport>) {
        let mut map = self.lock();
        let status = map.entry(kind).or_default();
        status.is_running = false;
        status.last_finished = Some(Utc::now());
        if report.is_some() {
            status.last_report = report;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityKind, KindStatus>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Proof that a run of one kind is in progress.
#[derive(Debug)]
pub struct RunTicket {
    board: StatusBoard,
    kind: EntityKind,
    released: bool,
}

impl RunTicket {
    pub fn finish(mut self, report: &RunReport) {
        self.board.release(self.kind, Some(report.clone()));
        self.released = true;
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if !self.released {
            self.board.release(self.kind, None);
        }
    }
}
