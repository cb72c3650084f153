use chrono::Utc;
use redb::ReadableTable;
use serde_json::Value;

use super::{Document, DocumentStore, FieldValue, Fields, StoreError};
use crate::db::{tables, Db};

/// Document store backed by the embedded redb database
///
/// Documents are kept as JSON bytes in a single table keyed by
/// `"<collection>/<key>"`. Every operation is one redb transaction run on the
/// blocking pool.
#[derive(Clone)]
pub struct RedbDocumentStore {
    db: Db,
}

impl RedbDocumentStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Read-modify-write one field inside a single write transaction
    async fn modify_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        expected: Option<Value>,
        value: Value,
    ) -> Result<(), StoreError> {
        let db = self.db.clone();
        let doc_key = tables::document_key(collection, key);
        let field = field.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(tables::DOCUMENTS)?;

                let mut doc: Document = match table.get(doc_key.as_str())? {
                    Some(bytes) => serde_json::from_slice(bytes.value())?,
                    None => return Err(StoreError::NotFound),
                };

                if let Some(expected) = expected {
                    if doc.get(&field) != Some(&expected) {
                        tracing::warn!(
                            "Conditional update rejected for {}: field '{}' changed",
                            doc_key,
                            field
                        );
                        return Err(StoreError::Conflict(field));
                    }
                }

                doc.insert(field, value);
                let bytes = serde_json::to_vec(&doc)?;
                table.insert(doc_key.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;

            Ok(())
        })
        .await?
    }
}

/// Materialize a field list, resolving server timestamps
fn resolve_fields(fields: Fields) -> Document {
    let now = Utc::now().to_rfc3339();
    fields
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                FieldValue::Value(v) => v,
                FieldValue::ServerTimestamp => Value::String(now.clone()),
            };
            (name, value)
        })
        .collect()
}

impl DocumentStore for RedbDocumentStore {
    async fn read_document(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Document>, StoreError> {
        let db = self.db.clone();
        let doc_key = tables::document_key(collection, key);

        tokio::task::spawn_blocking(move || -> Result<Option<Document>, StoreError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(tables::DOCUMENTS)?;

            let doc = table
                .get(doc_key.as_str())?
                .map(|bytes| serde_json::from_slice(bytes.value()))
                .transpose()?;

            Ok(doc)
        })
        .await?
    }

    async fn write_document(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let db = self.db.clone();
        let doc_key = tables::document_key(collection, key);
        let doc = resolve_fields(fields);

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let bytes = serde_json::to_vec(&doc)?;

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(tables::DOCUMENTS)?;
                table.insert(doc_key.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;

            tracing::debug!("Document written: {}", doc_key);
            Ok(())
        })
        .await?
    }

    async fn create_document(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        let db = self.db.clone();
        let doc_key = tables::document_key(collection, key);
        let doc = resolve_fields(fields);

        tokio::task::spawn_blocking(move || -> Result<Option<Document>, StoreError> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(tables::DOCUMENTS)?;

                if let Some(bytes) = table.get(doc_key.as_str())? {
                    let existing: Document = serde_json::from_slice(bytes.value())?;
                    tracing::debug!("Document already exists: {}", doc_key);
                    return Ok(Some(existing));
                }

                let bytes = serde_json::to_vec(&doc)?;
                table.insert(doc_key.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;

            tracing::debug!("Document created: {}", doc_key);
            Ok(None)
        })
        .await?
    }

    async fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.modify_field(collection, key, field, None, value).await
    }

    async fn compare_and_set_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        expected: Value,
        value: Value,
    ) -> Result<(), StoreError> {
        self.modify_field(collection, key, field, Some(expected), value)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> RedbDocumentStore {
        let db = crate::db::open_database(temp_dir.path().join("docs.db")).unwrap();
        RedbDocumentStore::new(db)
    }

    #[tokio::test]
    async fn test_read_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let doc = store.read_document("userPoints", "nobody").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_resolves_server_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = vec![
            ("points".to_string(), FieldValue::from(json!(0))),
            ("createdAt".to_string(), FieldValue::ServerTimestamp),
        ];
        store.write_document("userPoints", "u1", fields).await.unwrap();

        let doc = store.read_document("userPoints", "u1").await.unwrap().unwrap();
        assert_eq!(doc["points"], json!(0));
        let created_at = doc["createdAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = vec![("points".to_string(), FieldValue::from(json!(3)))];
        store.write_document("userPoints", "u1", fields).await.unwrap();

        assert!(store.read_document("other", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_field_keeps_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = vec![
            ("email".to_string(), FieldValue::from(json!("a@b.co"))),
            ("points".to_string(), FieldValue::from(json!(1))),
        ];
        store.write_document("userPoints", "u1", fields).await.unwrap();
        store
            .update_field("userPoints", "u1", "points", json!(9))
            .await
            .unwrap();

        let doc = store.read_document("userPoints", "u1").await.unwrap().unwrap();
        assert_eq!(doc["points"], json!(9));
        assert_eq!(doc["email"], json!("a@b.co"));
    }

    #[tokio::test]
    async fn test_create_document_never_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = vec![("points".to_string(), FieldValue::from(json!(0)))];
        let created = store.create_document("userPoints", "u1", fields).await.unwrap();
        assert!(created.is_none());

        store
            .update_field("userPoints", "u1", "points", json!(7))
            .await
            .unwrap();

        let fields = vec![("points".to_string(), FieldValue::from(json!(0)))];
        let existing = store
            .create_document("userPoints", "u1", fields)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing["points"], json!(7));

        let doc = store.read_document("userPoints", "u1").await.unwrap().unwrap();
        assert_eq!(doc["points"], json!(7));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let result = store
            .update_field("userPoints", "ghost", "points", json!(1))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_compare_and_set_detects_stale_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let fields = vec![("points".to_string(), FieldValue::from(json!(5)))];
        store.write_document("userPoints", "u1", fields).await.unwrap();

        store
            .compare_and_set_field("userPoints", "u1", "points", json!(5), json!(8))
            .await
            .unwrap();

        let stale = store
            .compare_and_set_field("userPoints", "u1", "points", json!(5), json!(2))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(ref f)) if f == "points"));

        let doc = store.read_document("userPoints", "u1").await.unwrap().unwrap();
        assert_eq!(doc["points"], json!(8));
    }
}
