use serde::{Deserialize, Serialize};

use crate::constants::RESET_TOKEN_TTL_SECS;

/// Pending password reset, keyed by its random token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenRecord {
    /// Normalized email of the account being reset
    pub email: String,
    /// Unix timestamp after which the token is rejected
    pub expires_at: i64,
}

impl ResetTokenRecord {
    /// Create a token record valid for the configured lifetime
    pub fn new(email: String, now: i64) -> Self {
        Self {
            email,
            expires_at: now + RESET_TOKEN_TTL_SECS,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reset_token_record() {
        let now = 1000000;
        let record = ResetTokenRecord::new("user@example.com".to_string(), now);

        assert_eq!(record.expires_at, now + RESET_TOKEN_TTL_SECS);
        assert!(!record.is_expired(now));
        assert!(!record.is_expired(now + RESET_TOKEN_TTL_SECS - 1));
        assert!(record.is_expired(now + RESET_TOKEN_TTL_SECS));
    }
}
