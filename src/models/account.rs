use serde::{Deserialize, Serialize};

/// Account record stored in redb, keyed by normalized email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Stable account identifier
    pub uid: String,
    /// Email as entered at sign-up (trimmed)
    pub email: String,
    /// Per-account random salt (hex)
    pub password_salt: String,
    /// Peppered PBKDF2-HMAC-SHA256 of the password (hex)
    pub password_hash: String,
    /// PBKDF2 rounds the hash was computed with
    pub password_rounds: u32,
    /// When the account was created (Unix timestamp)
    pub created_at: i64,
}

impl AccountRecord {
    pub fn to_account(&self) -> Account {
        Account {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

/// Signed-in identity handed to the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub uid: String,
    pub email: String,
}

impl Account {
    /// Lookup key for an email: trimmed and lowercased
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Loose structural email check: `local@domain.tld`, no whitespace
    pub fn validate_email(email: &str) -> bool {
        let email = email.trim();
        if email.chars().any(char::is_whitespace) {
            return false;
        }
        let mut parts = email.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }
}
