//! Row types for the LanceDB tables.

use irminsul_common::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TABLE_ENTITY_RECORDS: &str = "entity_records";

/// A persisted entity: one row per `(kind, natural_key)`.
///
/// `attributes` is always a JSON object. Keys absent from it were never
/// observed; they are not the same as a stored `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: uuid::Uuid,
    pub kind: EntityKind,
    pub natural_key: String,
    pub attributes: Map<String, Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoredRecord {
    pub fn new(kind: EntityKind, natural_key: impl Into<String>, attributes: Map<String, Value>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            kind,
            natural_key: natural_key.into(),
            attributes,
            created_at: now,
            updated_at: now,
        }
    }
}
