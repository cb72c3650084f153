//! Authentication provider seam.
//!
//! [`AuthProvider`] is the account backend (create, sign in, password reset).
//! [`AuthClient`] is the per-session handle that tracks who is signed in and
//! publishes changes to subscribers.

mod client;
mod local;
mod mailer;

pub use client::{AuthClient, AuthSubscription};
pub use local::LocalAuth;
pub use mailer::{LogMailer, MailError, Mailer};

use hmac::digest::InvalidLength;
use std::future::Future;
use thiserror::Error;

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::db::{backend_error_from, DbError};
use crate::models::Account;

/// Authentication failures; the display text is shown to the user verbatim
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("The email address is badly formatted.")]
    InvalidEmail,

    #[error("Password should be at least {} characters.", MIN_PASSWORD_LENGTH)]
    WeakPassword,

    #[error("The email address is already in use by another account.")]
    EmailAlreadyInUse,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("The password reset link is invalid or has expired.")]
    InvalidResetToken,

    #[error("Password reset email is not available on this server.")]
    ResetUnavailable,

    #[error("The password reset email could not be sent.")]
    Delivery(#[from] MailError),

    #[error("The authentication service is unavailable.")]
    Hashing(InvalidLength),

    #[error("The authentication service is unavailable.")]
    Backend(#[from] DbError),
}

backend_error_from!(AuthError);

impl From<InvalidLength> for AuthError {
    fn from(err: InvalidLength) -> Self {
        tracing::error!("Password hashing failed: {}", err);
        AuthError::Hashing(err)
    }
}

/// Account backend consumed by [`AuthClient`]
pub trait AuthProvider: Clone + Send + Sync + 'static {
    /// Register a new account; the caller is signed in on success
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Account, AuthError>> + Send;

    /// Check credentials and return the matching account
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Account, AuthError>> + Send;

    /// Deliver a password reset link to the account's email
    fn send_password_reset(&self, email: &str)
        -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Set a new password using a token from a reset link
    fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;
}
