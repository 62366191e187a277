//! Persistence collaborator used by the synchronizer.
//!
//! Three calls make up the whole contract: lookup by natural key, create,
//! and update of changed attributes. Each write is atomic on its own; nothing
//! here spans more than one record.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use irminsul_common::EntityKind;
use irminsul_db::{Database, RecordRepository};
use serde_json::{Map, Value};

use crate::error::StoreError;

pub use irminsul_db::StoredRecord as PersistedRecord;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_natural_key(
        &self,
        kind: EntityKind,
        natural_key: &str,
    ) -> Result<Option<PersistedRecord>, StoreError>;

    async fn create(
        &self,
        kind: EntityKind,
        natural_key: &str,
        attributes: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError>;

    /// Overwrites only the given top-level fields and bumps `updated_at`.
    async fn update(
        &self,
        kind: EntityKind,
        natural_key: &str,
        changed: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError>;
}

// ── LanceDB ──────────────────────────────────────────────────────────────────

/// Store backed by the embedded LanceDB `entity_records` table.
#[derive(Clone)]
pub struct LanceRecordStore {
    records: RecordRepository,
}

impl LanceRecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { records: RecordRepository::new(db) }
    }

    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::open(path).await?;
        db.initialize().await?;
        Ok(Self::new(Arc::new(db)))
    }
}

#[async_trait]
impl RecordStore for LanceRecordStore {
    async fn find_by_natural_key(
        &self,
        kind: EntityKind,
        natural_key: &str,
    ) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.records.find_by_natural_key(kind, natural_key).await?)
    }

    async fn create(
        &self,
        kind: EntityKind,
        natural_key: &str,
        attributes: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError> {
        let record = PersistedRecord::new(kind, natural_key, attributes);
        self.records.insert(&record).await?;
        Ok(record)
    }

    async fn update(
        &self,
        kind: EntityKind,
        natural_key: &str,
        changed: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError> {
        let existing = self
            .records
            .find_by_natural_key(kind, natural_key)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{kind}/{natural_key}")))?;
        let mut attributes = existing.attributes;
        attributes.extend(changed);
        Ok(self.records.update_attributes(kind, natural_key, attributes).await?)
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local store, used for dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<(EntityKind, String), PersistedRecord>>,
    writes: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful create/update calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, kind: EntityKind, natural_key: &str) -> Option<PersistedRecord> {
        self.lock().get(&(kind, natural_key.to_string())).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(EntityKind, String), PersistedRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_natural_key(
        &self,
        kind: EntityKind,
        natural_key: &str,
    ) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.get(kind, natural_key))
    }

    async fn create(
        &self,
        kind: EntityKind,
        natural_key: &str,
        attributes: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError> {
        let mut records = self.lock();
        let key = (kind, natural_key.to_string());
        if records.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{kind}/{natural_key}")));
        }
        let record = PersistedRecord::new(kind, natural_key, attributes);
        records.insert(key, record.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    async fn update(
        &self,
        kind: EntityKind,
        natural_key: &str,
        changed: Map<String, Value>,
    ) -> Result<PersistedRecord, StoreError> {
        let mut records = self.lock();
        let record = records
            .get_mut(&(kind, natural_key.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("{kind}/{natural_key}")))?;
        record.attributes.extend(changed);
        record.updated_at = chrono::Utc::now();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(record.clone())
    }
}
