//! Arrow schema and conversion utilities for LanceDB.

use crate::error::{DbError, Result};
use crate::schema::StoredRecord;
use arrow_array::{Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn entity_record_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("natural_key", DataType::Utf8, false),
        Field::new("attributes", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("updated_at", DataType::Utf8, false),
    ]))
}

pub fn record_to_batch(record: &StoredRecord) -> Result<RecordBatch> {
    let attributes = serde_json::to_string(&record.attributes)?;

    let id = StringArray::from(vec![record.id.to_string()]);
    let kind = StringArray::from(vec![record.kind.as_str()]);
    let natural_key = StringArray::from(vec![record.natural_key.as_str()]);
    let attributes = StringArray::from(vec![attributes]);
    let created_at = StringArray::from(vec![record.created_at.to_rfc3339()]);
    let updated_at = StringArray::from(vec![record.updated_at.to_rfc3339()]);

    RecordBatch::try_new(
        entity_record_schema(),
        vec![
            Arc::new(id) as Arc<dyn Array>,
            Arc::new(kind),
            Arc::new(natural_key),
            Arc::new(attributes),
            Arc::new(created_at),
            Arc::new(updated_at),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn batch_to_record(batch: &RecordBatch, row: usize) -> Result<StoredRecord> {
    let get_string = |name: &str| -> Result<String> {
        let col = batch
            .column_by_name(name)
            .ok_or_else(|| DbError::Corrupt(format!("missing column {name}")))?;
        let arr = col
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DbError::Corrupt(format!("column {name} is not utf8")))?;
        if arr.is_null(row) {
            return Err(DbError::Corrupt(format!("null {name} at row {row}")));
        }
        Ok(arr.value(row).to_string())
    };

    let parse_time = |name: &str| -> Result<chrono::DateTime<chrono::Utc>> {
        let raw = get_string(name)?;
        chrono::DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DbError::Corrupt(format!("{name}: {e}")))
    };

    let id = uuid::Uuid::parse_str(&get_string("id")?)
        .map_err(|e| DbError::Corrupt(format!("id: {e}")))?;
    let kind = get_string("kind")?
        .parse()
        .map_err(|e: irminsul_common::IrminsulError| DbError::Corrupt(e.to_string()))?;
    let attributes = match serde_json::from_str(&get_string("attributes")?)? {
        serde_json::Value::Object(map) => map,
        other => return Err(DbError::Corrupt(format!("attributes is not an object: {other}"))),
    };

    Ok(StoredRecord {
        id,
        kind,
        natural_key: get_string("natural_key")?,
        attributes,
        created_at: parse_time("created_at")?,
        updated_at: parse_time("updated_at")?,
    })
}
