//! Database connection and table management.

use crate::error::Result;
use crate::schema;
use crate::schema_arrow::entity_record_schema;
use arrow_array::RecordBatchIterator;
use lancedb::connection::Connection;
use std::path::Path;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str).execute().await?;
        tracing::debug!(path = %path_str, "Opened LanceDB");

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the tables if they don't exist yet.
    pub async fn initialize(&self) -> Result<()> {
        if !self.table_exists(schema::TABLE_ENTITY_RECORDS).await? {
            let empty_iter = RecordBatchIterator::new(vec![], entity_record_schema());
            self.conn
                .create_table(schema::TABLE_ENTITY_RECORDS, empty_iter)
                .execute()
                .await?;
            tracing::info!(table = schema::TABLE_ENTITY_RECORDS, "Created table");
        }
        Ok(())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.iter().any(|t| t == name))
    }
}
