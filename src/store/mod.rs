//! Document store seam.
//!
//! The view layer only ever talks to a [`DocumentStore`]: read a document by
//! key, replace a document, or update one field. [`RedbDocumentStore`] is the
//! embedded implementation used by the server.

mod local;

pub use local::RedbDocumentStore;

use serde_json::Value;
use std::future::Future;
use thiserror::Error;

use crate::db::{backend_error_from, DbError};

/// A stored document: a JSON object
pub type Document = serde_json::Map<String, Value>;

/// Value written into a document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Stored as given
    Value(Value),
    /// Replaced by the store's clock at write time (RFC3339)
    ServerTimestamp,
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

/// Ordered field list for `write_document`
pub type Fields = Vec<(String, FieldValue)>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found")]
    NotFound,

    #[error("Field '{0}' was changed by another writer")]
    Conflict(String),

    #[error("Document store failure: {0}")]
    Backend(#[from] DbError),
}

backend_error_from!(StoreError);

/// Keyed document storage grouped into named collections
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Read a document, `None` if it does not exist
    fn read_document(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Create or fully replace a document
    fn write_document(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create a document only if the key is free
    ///
    /// Returns `None` when the document was created, or the document already
    /// stored under the key, which is left untouched.
    fn create_document(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Set one field of an existing document; `NotFound` if absent
    ///
    /// Part of the provider contract. Balance writes go through
    /// [`DocumentStore::compare_and_set_field`] instead; unconditional
    /// updates are used for fields without concurrent writers.
    fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Set one field only if it still holds `expected`; `Conflict` otherwise
    fn compare_and_set_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        expected: Value,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
