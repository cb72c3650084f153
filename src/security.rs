use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password with its per-account salt and the server-side pepper
///
/// # Algorithm
/// `stretched = PBKDF2-HMAC-SHA256(password, salt, rounds)`
/// `hash = HMAC-SHA256(key = pepper, stretched)`
///
/// The pepper lives in the environment, never in the database, so a leaked
/// database file alone is not enough to brute-force passwords offline. The
/// round count slows down guessing even when the pepper leaks too.
pub fn hash_password(
    password: &str,
    salt: &str,
    pepper: &str,
    rounds: u32,
) -> Result<String, InvalidLength> {
    let mac = password_mac(password, salt, pepper, rounds)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a password against a stored hash in constant time
pub fn verify_password(
    password: &str,
    salt: &str,
    pepper: &str,
    rounds: u32,
    expected_hash: &str,
) -> bool {
    let expected = match hex::decode(expected_hash) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::error!("Stored password hash is not valid hex");
            return false;
        }
    };

    match password_mac(password, salt, pepper, rounds) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => {
            tracing::error!("Failed to create HMAC instance");
            false
        }
    }
}

fn password_mac(
    password: &str,
    salt: &str,
    pepper: &str,
    rounds: u32,
) -> Result<HmacSha256, InvalidLength> {
    let stretched =
        pbkdf2::pbkdf2_hmac_array::<Sha256, 32>(password.as_bytes(), salt.as_bytes(), rounds);
    let mut mac = HmacSha256::new_from_slice(pepper.as_bytes())?;
    mac.update(&stretched);
    Ok(mac)
}

// =============================================================================
// Identifiers
// =============================================================================

/// Random per-account salt (32 hex characters)
pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// New account identifier
pub fn generate_uid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Unguessable token for reset links and session cookies (64 hex characters)
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Check that a token has the shape produced by `generate_token`
pub fn validate_token(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &str = "test-pepper";
    const ROUNDS: u32 = 1_000;

    #[test]
    fn test_hash_password_is_deterministic() {
        let a = hash_password("hunter22", "salt", PEPPER, ROUNDS).unwrap();
        let b = hash_password("hunter22", "salt", PEPPER, ROUNDS).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_password_depends_on_salt_pepper_and_rounds() {
        let base = hash_password("hunter22", "salt", PEPPER, ROUNDS).unwrap();
        assert_ne!(base, hash_password("hunter22", "other-salt", PEPPER, ROUNDS).unwrap());
        assert_ne!(base, hash_password("hunter22", "salt", "other-pepper", ROUNDS).unwrap());
        assert_ne!(base, hash_password("hunter22", "salt", PEPPER, ROUNDS + 1).unwrap());
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let hash = hash_password("correct horse", &salt, PEPPER, ROUNDS).unwrap();

        assert!(verify_password("correct horse", &salt, PEPPER, ROUNDS, &hash));
        assert!(!verify_password("wrong horse", &salt, PEPPER, ROUNDS, &hash));
        assert!(!verify_password("correct horse", &salt, "other-pepper", ROUNDS, &hash));
        assert!(!verify_password("correct horse", &salt, PEPPER, 1, &hash));
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(!verify_password("pw", "salt", PEPPER, ROUNDS, "not-hex"));
        assert!(!verify_password("pw", "salt", PEPPER, ROUNDS, "abcd"));
    }

    #[test]
    fn test_generated_tokens() {
        let token = generate_token();
        assert!(validate_token(&token));
        assert_ne!(token, generate_token());

        assert!(!validate_token("abc"));
        assert!(!validate_token(&"z".repeat(64)));
        assert_eq!(generate_salt().len(), 32);
    }
}
