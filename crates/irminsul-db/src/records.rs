//! Entity record repository.
//!
//! Lookup and write operations keyed by `(kind, natural_key)`.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{StoredRecord, TABLE_ENTITY_RECORDS};
use crate::schema_arrow::{batch_to_record, record_to_batch};
use futures::TryStreamExt;
use irminsul_common::EntityKind;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct RecordRepository {
    db: Arc<Database>,
}

fn key_filter(kind: EntityKind, natural_key: &str) -> String {
    let escaped = natural_key.replace('\'', "''");
    format!("kind = '{}' AND natural_key = '{}'", kind.as_str(), escaped)
}

impl RecordRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn table(&self) -> Result<Table> {
        Ok(self
            .db
            .connection()
            .open_table(TABLE_ENTITY_RECORDS)
            .execute()
            .await?)
    }

    async fn collect(&self, filter: String) -> Result<Vec<StoredRecord>> {
        let batches: Vec<arrow_array::RecordBatch> = self
            .table()
            .await?
            .query()
            .only_if(filter)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut records = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                records.push(batch_to_record(batch, row)?);
            }
        }
        Ok(records)
    }

    /// Returns the record for `(kind, natural_key)`, or `None`.
    ///
    /// More than one matching row means the uniqueness invariant was broken
    /// outside this repository; that surfaces as `DbError::Duplicate`.
    pub async fn find_by_natural_key(
        &self,
        kind: EntityKind,
        natural_key: &str,
    ) -> Result<Option<StoredRecord>> {
        let mut rows = self.collect(key_filter(kind, natural_key)).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(DbError::Duplicate(format!("{kind}/{natural_key} has {n} rows"))),
        }
    }

    /// Insert a new record. Fails with `Duplicate` if the key is taken.
    pub async fn insert(&self, record: &StoredRecord) -> Result<()> {
        if self.find_by_natural_key(record.kind, &record.natural_key).await?.is_some() {
            return Err(DbError::Duplicate(format!("{}/{}", record.kind, record.natural_key)));
        }

        let batch = record_to_batch(record)?;
        let schema = batch.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(batch)], schema);
        self.table().await?.add(iter).execute().await?;

        tracing::debug!(kind = %record.kind, key = %record.natural_key, "Inserted record");
        Ok(())
    }

    /// Overwrite the attributes of an existing record and bump `updated_at`.
    pub async fn update_attributes(
        &self,
        kind: EntityKind,
        natural_key: &str,
        attributes: Map<String, Value>,
    ) -> Result<StoredRecord> {
        let mut record = self
            .find_by_natural_key(kind, natural_key)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("{kind}/{natural_key}")))?;
        record.attributes = attributes;
        record.updated_at = chrono::Utc::now();

        let batch = record_to_batch(&record)?;
        let schema = batch.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(batch)], schema);

        let table = self.table().await?;
        let mut builder = table.merge_insert(&["id"]);
        builder.when_matched_update_all(None);
        builder.execute(Box::new(iter)).await?;

        tracing::debug!(kind = %kind, key = %natural_key, "Updated record");
        Ok(record)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.table().await?.count_rows(None).await? as u64)
    }

    pub async fn count_by_kind(&self, kind: EntityKind) -> Result<u64> {
        let n = self
            .table()
            .await?
            .count_rows(Some(format!("kind = '{}'", kind.as_str())))
            .await?;
        Ok(n as u64)
    }
}
