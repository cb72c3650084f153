use chrono::Utc;
use redb::{ReadableTable, Table};
use std::sync::Arc;

use super::{AuthError, AuthProvider, LogMailer, Mailer};
use crate::constants::MIN_PASSWORD_LENGTH;
use crate::db::{decode, encode, tables, Db};
use crate::models::{Account, AccountRecord, ResetTokenRecord};
use crate::security::{
    generate_salt, generate_token, generate_uid, hash_password, verify_password,
};
use crate::Config;

/// Email/password accounts stored in the embedded database
///
/// # Security
/// - Passwords are stored as `HMAC-SHA256(pepper, PBKDF2(password, salt))`
/// - The pepper comes from the environment, not the database
/// - Reset tokens are random, single use and expire after one hour
/// - Without a mailer, password reset is refused instead of pretending to send
#[derive(Clone)]
pub struct LocalAuth {
    db: Db,
    pepper: Arc<str>,
    hash_rounds: u32,
    public_base_url: Arc<str>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl LocalAuth {
    /// Create a provider; outside production reset links go to the log
    pub fn new(db: Db, config: &Config) -> Self {
        let mailer: Option<Arc<dyn Mailer>> = if config.is_production() {
            tracing::warn!("No mailer configured, password reset is disabled");
            None
        } else {
            Some(Arc::new(LogMailer))
        };

        Self {
            db,
            pepper: Arc::from(config.password_pepper.as_str()),
            hash_rounds: config.password_hash_rounds,
            public_base_url: Arc::from(config.public_base_url.as_str()),
            mailer,
        }
    }

    /// Replace the reset link delivery
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password/confirm?token={}", self.public_base_url, token)
    }
}

fn check_email(email: &str) -> Result<String, AuthError> {
    if !Account::validate_email(email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(Account::normalize_email(email))
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Remove expired tokens, and every token of `email` when given
fn purge_reset_tokens(
    tokens: &mut Table<'_, &'static str, &'static [u8]>,
    email: Option<&str>,
    now: i64,
) -> Result<usize, AuthError> {
    let mut stale = Vec::new();
    for entry in tokens.iter()? {
        let (token, bytes) = entry?;
        let remove = match decode::<ResetTokenRecord>(bytes.value()) {
            Ok(record) => record.is_expired(now) || Some(record.email.as_str()) == email,
            Err(_) => true,
        };
        if remove {
            stale.push(token.value().to_string());
        }
    }

    for token in &stale {
        tokens.remove(token.as_str())?;
    }
    Ok(stale.len())
}

impl AuthProvider for LocalAuth {
    async fn create_account(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let key = check_email(email)?;
        check_password(password)?;

        let email = email.trim().to_string();
        let password = password.to_string();
        let pepper = self.pepper.clone();
        let rounds = self.hash_rounds;
        let db = self.db.clone();

        let account = tokio::task::spawn_blocking(move || -> Result<Account, AuthError> {
            let salt = generate_salt();
            let record = AccountRecord {
                uid: generate_uid(),
                email,
                password_hash: hash_password(&password, &salt, &pepper, rounds)?,
                password_salt: salt,
                password_rounds: rounds,
                created_at: Utc::now().timestamp(),
            };

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(tables::ACCOUNTS)?;

                if table.get(key.as_str())?.is_some() {
                    tracing::info!("Sign up rejected, email already registered");
                    return Err(AuthError::EmailAlreadyInUse);
                }

                let bytes = encode(&record)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;

            Ok(record.to_account())
        })
        .await??;

        tracing::info!("New account created: {}", account.uid);
        Ok(account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let key = check_email(email)?;
        let password = password.to_string();
        let pepper = self.pepper.clone();
        let db = self.db.clone();

        let account = tokio::task::spawn_blocking(move || -> Result<Option<Account>, AuthError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(tables::ACCOUNTS)?;

            let record = table
                .get(key.as_str())?
                .map(|bytes| decode::<AccountRecord>(bytes.value()))
                .transpose()?;

            let account = record
                .filter(|record| {
                    verify_password(
                        &password,
                        &record.password_salt,
                        &pepper,
                        record.password_rounds,
                        &record.password_hash,
                    )
                })
                .map(|record| record.to_account());
            Ok(account)
        })
        .await??;

        match account {
            Some(account) => {
                tracing::info!("Account signed in: {}", account.uid);
                Ok(account)
            }
            None => {
                tracing::warn!("Failed sign in attempt");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let key = check_email(email)?;
        let mailer = self.mailer.clone().ok_or_else(|| {
            tracing::error!("Password reset requested but no mailer is configured");
            AuthError::ResetUnavailable
        })?;

        let token = generate_token();
        let db = self.db.clone();
        let token_key = token.clone();

        // Unknown emails succeed silently so the endpoint can't probe for accounts
        let recipient = tokio::task::spawn_blocking(move || -> Result<Option<String>, AuthError> {
            let now = Utc::now().timestamp();

            let write_txn = db.begin_write()?;
            let recipient = {
                let accounts = write_txn.open_table(tables::ACCOUNTS)?;
                let account = accounts
                    .get(key.as_str())?
                    .map(|bytes| decode::<AccountRecord>(bytes.value()))
                    .transpose()?;
                drop(accounts);

                // Earlier links for the same account stop working
                let mut tokens = write_txn.open_table(tables::RESET_TOKENS)?;
                let email = account.as_ref().map(|_| key.as_str());
                let purged = purge_reset_tokens(&mut tokens, email, now)?;
                if purged > 0 {
                    tracing::debug!("Purged {} stale reset tokens", purged);
                }

                match account {
                    Some(account) => {
                        let record = ResetTokenRecord::new(key, now);
                        let bytes = encode(&record)?;
                        tokens.insert(token_key.as_str(), bytes.as_slice())?;
                        Some(account.email)
                    }
                    None => None,
                }
            };
            write_txn.commit()?;

            Ok(recipient)
        })
        .await??;

        match recipient {
            Some(email) => mailer.send_password_reset(&email, &self.reset_link(&token))?,
            None => tracing::debug!("Password reset requested for unknown email"),
        }

        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        check_password(new_password)?;

        let new_password = new_password.to_string();
        let pepper = self.pepper.clone();
        let rounds = self.hash_rounds;
        let db = self.db.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), AuthError> {
            let now = Utc::now().timestamp();

            let write_txn = db.begin_write()?;
            let outcome = {
                // Tokens are single use: removed whether or not they are still valid
                let mut tokens = write_txn.open_table(tables::RESET_TOKENS)?;
                let reset = tokens
                    .remove(token.as_str())?
                    .map(|bytes| decode::<ResetTokenRecord>(bytes.value()))
                    .transpose()?;
                drop(tokens);

                match reset {
                    Some(reset) if !reset.is_expired(now) => {
                        let mut accounts = write_txn.open_table(tables::ACCOUNTS)?;
                        let account = accounts
                            .get(reset.email.as_str())?
                            .map(|bytes| decode::<AccountRecord>(bytes.value()))
                            .transpose()?;

                        match account {
                            Some(mut account) => {
                                let salt = generate_salt();
                                account.password_hash =
                                    hash_password(&new_password, &salt, &pepper, rounds)?;
                                account.password_salt = salt;
                                account.password_rounds = rounds;
                                let bytes = encode(&account)?;
                                accounts.insert(reset.email.as_str(), bytes.as_slice())?;
                                tracing::info!("Password reset completed: {}", account.uid);
                                Ok(())
                            }
                            None => Err(AuthError::InvalidResetToken),
                        }
                    }
                    Some(_) => {
                        tracing::info!("Expired password reset token used");
                        Err(AuthError::InvalidResetToken)
                    }
                    None => {
                        tracing::warn!("Unknown password reset token used");
                        Err(AuthError::InvalidResetToken)
                    }
                }
            };
            write_txn.commit()?;

            outcome
        })
        .await?
    }
}
