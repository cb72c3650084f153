use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Balance record held in the `userPoints` collection, keyed by account id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRecord {
    pub email: String,
    pub points: u64,
    /// Server-assigned creation time (RFC3339)
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
}

impl PointsRecord {
    /// Interpret a stored document as a balance record
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(doc))
    }
}
