pub mod tables;

use redb::{Database, Error as RedbError};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Failures raised while talking to the embedded database
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Implement `From<e>` for every low-level database error, routing each
/// through `DbError` into the given error type's `Backend` variant.
macro_rules! backend_error_from {
    (@each $target:ty, $($source:ty),+) => {
        $(
            impl From<$source> for $target {
                fn from(err: $source) -> Self {
                    Self::Backend($crate::db::DbError::from(err))
                }
            }
        )+
    };
    ($target:ty) => {
        $crate::db::backend_error_from!(
            @each $target,
            redb::TransactionError,
            redb::TableError,
            redb::StorageError,
            redb::CommitError,
            bincode::error::EncodeError,
            bincode::error::DecodeError,
            serde_json::Error,
            tokio::task::JoinError
        );
    };
}
pub(crate) use backend_error_from;

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                RedbError::Io(e)
            })?;
        }
    }

    let db = Database::create(path)?;
    init_tables(&db)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Create every table so read transactions never hit a missing table
#[allow(clippy::result_large_err)]
pub fn init_tables(db: &Database) -> Result<(), RedbError> {
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::ACCOUNTS)?;
        let _ = write_txn.open_table(tables::RESET_TOKENS)?;
        let _ = write_txn.open_table(tables::DOCUMENTS)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Encode a record for storage
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DbError> {
    Ok(bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?)
}

/// Decode a stored record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DbError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(value)
}
