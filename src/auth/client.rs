use tokio::sync::watch;

use super::{AuthError, AuthProvider};
use crate::models::Account;

/// Per-session authentication handle
///
/// Tracks the signed-in account for one browser session and publishes every
/// change on a watch channel. Views subscribe with
/// [`AuthClient::on_auth_state_changed`]; dropping the returned
/// [`AuthSubscription`] unregisters it.
pub struct AuthClient<A> {
    provider: A,
    state: watch::Sender<Option<Account>>,
}

impl<A: AuthProvider> AuthClient<A> {
    pub fn new(provider: A) -> Self {
        // Only subscriptions hold receivers, so receiver_count() is the subscriber count
        let (state, _) = watch::channel(None);
        Self { provider, state }
    }

    /// Create an account and sign this session in as it
    pub async fn create_account(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let account = self.provider.create_account(email, password).await?;
        self.state.send_replace(Some(account.clone()));
        Ok(account)
    }

    /// Sign this session in
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let account = self.provider.sign_in(email, password).await?;
        self.state.send_replace(Some(account.clone()));
        Ok(account)
    }

    /// Sign this session out; a no-op when nobody is signed in
    pub fn sign_out(&self) {
        if let Some(account) = self.state.send_replace(None) {
            tracing::info!("Account signed out: {}", account.uid);
        }
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.provider.send_password_reset(email).await
    }

    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.provider.confirm_password_reset(token, new_password).await
    }

    pub fn current_user(&self) -> Option<Account> {
        self.state.borrow().clone()
    }

    /// Register for auth state changes
    ///
    /// The first poll of a new subscription reports the current state.
    pub fn on_auth_state_changed(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.state.subscribe(),
            primed: true,
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }
}

/// Live registration for auth state changes; unregisters on drop
pub struct AuthSubscription {
    receiver: watch::Receiver<Option<Account>>,
    primed: bool,
}

impl AuthSubscription {
    /// Take the latest auth state if it changed since the last poll
    ///
    /// `Some(None)` means the session was signed out.
    pub fn poll_change(&mut self) -> Option<Option<Account>> {
        let changed =
            std::mem::take(&mut self.primed) || self.receiver.has_changed().unwrap_or(false);
        if changed {
            Some(self.receiver.borrow_and_update().clone())
        } else {
            None
        }
    }
}
