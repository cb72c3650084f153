use redb::TableDefinition;

/// Accounts table: normalized email -> AccountRecord (serialized)
pub const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Reset tokens table: token -> ResetTokenRecord (serialized)
pub const RESET_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("reset_tokens");

/// Documents table: "<collection>/<key>" -> JSON object bytes
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Build the documents table key for a collection entry
pub fn document_key(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}
