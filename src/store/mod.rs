//! Document store contract
//!
//! The persistent backing store is an external collaborator; this trait is
//! the slice of its API the ledger and catalog consume. [`memory`] provides
//! the in-process implementation used by the binary and tests.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryStore;

/// Sentinel value replaced with the write-time UTC instant by the store.
pub const SERVER_TIMESTAMP: &str = "__server_timestamp__";

/// Field value stamped by the store at write time.
#[must_use]
pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Read query modifiers: optional ordering and a result cap.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored document: store-assigned id plus its JSON fields.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Contract of the persistent document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a document; returns the store-assigned record id.
    ///
    /// # Errors
    /// Returns `Backend` on write failure.
    async fn add_doc(&self, collection: &str, fields: Value) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    /// Returns `NotFound` if the document does not exist.
    async fn update_doc(&self, collection: &str, id: &str, fields: Value)
        -> Result<(), StoreError>;

    /// Read documents, applying the query's ordering and limit.
    ///
    /// # Errors
    /// Returns `Backend` on read failure.
    async fn get_docs(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Remove a document.
    ///
    /// # Errors
    /// Returns `NotFound` if the document does not exist.
    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
