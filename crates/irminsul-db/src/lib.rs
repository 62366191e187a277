//! Irminsul Database Layer
//!
//! Embedded LanceDB storage for reconciled game-entity records. One table
//! holds every entity kind; a record is addressed by `(kind, natural_key)`
//! and carries its observed attributes as a JSON object.
//!
//! # Example
//!
//! ```rust,no_run
//! use irminsul_db::{Database, RecordRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./data/irminsul.lancedb").await?;
//!     db.initialize().await?;
//!
//!     let records = RecordRepository::new(std::sync::Arc::new(db));
//!     println!("{} records", records.count().await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod records;
pub mod schema;
pub mod schema_arrow;

pub use database::Database;
pub use error::{DbError, Result};
pub use records::RecordRepository;
pub use schema::{StoredRecord, TABLE_ENTITY_RECORDS};
