//! Per-session page state and its action handlers.
//!
//! A [`PointsView`] is the only mutable state behind one browser session. Each
//! handler runs one user action to completion, awaiting backend calls in
//! order, and leaves any failure as an inline message rather than an error.

use crate::auth::{AuthClient, AuthProvider, AuthSubscription};
use crate::balance::{adjust_balance, ensure_balance_record, parse_adjustment, read_balance};
use crate::constants::{ERR_RESET_EMAIL_REQUIRED, INFO_PASSWORD_CHANGED, INFO_RESET_EMAIL_SENT};
use crate::models::Account;
use crate::store::DocumentStore;

/// Display theme, mirrored into the page's `data-theme` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Label for the control that switches away from this theme
    pub fn toggle_label(self) -> &'static str {
        match self {
            Theme::Light => "Switch to Dark Mode",
            Theme::Dark => "Switch to Light Mode",
        }
    }
}

/// Immutable copy of the view state for rendering
///
/// The default is what a visitor without a session sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub user: Option<Account>,
    pub points: u64,
    pub error: Option<String>,
    pub info_message: Option<String>,
    pub theme: Theme,
    pub pending_adjustment: String,
}

pub struct PointsView<A, S> {
    auth: AuthClient<A>,
    subscription: AuthSubscription,
    store: S,
    user: Option<Account>,
    points: u64,
    error: Option<String>,
    info_message: Option<String>,
    theme: Theme,
    pending_adjustment: String,
}

impl<A: AuthProvider, S: DocumentStore> PointsView<A, S> {
    pub fn new(provider: A, store: S) -> Self {
        let auth = AuthClient::new(provider);
        let subscription = auth.on_auth_state_changed();
        Self {
            auth,
            subscription,
            store,
            user: None,
            points: 0,
            error: None,
            info_message: None,
            theme: Theme::default(),
            pending_adjustment: String::new(),
        }
    }

    pub fn auth(&self) -> &AuthClient<A> {
        &self.auth
    }

    /// Apply any pending auth state change to the local state
    ///
    /// On sign-in the balance record is fetched or created. A failed create
    /// leaves the session signed in with a local balance of 0.
    pub async fn sync_auth_state(&mut self) {
        let Some(state) = self.subscription.poll_change() else {
            return;
        };
        if state == self.user {
            return;
        }
        self.error = None;

        match state {
            Some(account) => {
                self.points = match ensure_balance_record(&self.store, &account).await {
                    Ok(points) => points,
                    Err(e) => {
                        tracing::error!(
                            "Error loading balance record for {}: {:?}",
                            account.uid,
                            e
                        );
                        self.error = Some(e.to_string());
                        0
                    }
                };
                self.user = Some(account);
            }
            None => {
                self.user = None;
                self.points = 0;
            }
        }
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) {
        self.error = None;
        if let Err(e) = self.auth.create_account(email, password).await {
            tracing::warn!("Sign up error: {}", e);
            self.error = Some(format!("Sign up failed: {}", e));
        }
        self.sync_auth_state().await;
    }

    pub async fn login(&mut self, email: &str, password: &str) {
        self.error = None;
        if let Err(e) = self.auth.sign_in(email, password).await {
            tracing::warn!("Login error: {}", e);
            self.error = Some(format!("Login failed: {}", e));
        }
        self.sync_auth_state().await;
    }

    pub async fn logout(&mut self) {
        self.error = None;
        self.auth.sign_out();
        self.sync_auth_state().await;
    }

    /// Apply the adjustment typed into the points form
    pub async fn adjust_points(&mut self, input: &str) {
        let Some(account) = self.user.clone() else {
            return;
        };
        self.pending_adjustment = input.to_string();

        let delta = match parse_adjustment(input) {
            Ok(Some(delta)) => delta,
            Ok(None) => return,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        self.error = None;

        match adjust_balance(&self.store, &account.uid, self.points, delta).await {
            Ok(points) => {
                self.points = points;
                self.pending_adjustment.clear();
            }
            Err(e) => {
                tracing::error!("Error updating points for {}: {:?}", account.uid, e);
                self.error = Some(e.to_string());

                // Resynchronize with whatever the store holds now
                match read_balance(&self.store, &account.uid).await {
                    Ok(Some(points)) => self.points = points,
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Balance resync failed for {}: {:?}", account.uid, e),
                }
            }
        }
    }

    pub async fn password_reset(&mut self, email: &str) {
        self.info_message = None;
        if email.trim().is_empty() {
            self.error = Some(ERR_RESET_EMAIL_REQUIRED.to_string());
            return;
        }
        self.error = None;

        match self.auth.send_password_reset(email).await {
            Ok(()) => self.info_message = Some(INFO_RESET_EMAIL_SENT.to_string()),
            Err(e) => {
                tracing::warn!("Password reset error: {}", e);
                self.error = Some(format!("Password reset failed: {}", e));
            }
        }
    }

    /// Finish a reset started from an emailed link
    pub async fn confirm_password_reset(&mut self, token: &str, new_password: &str) {
        self.error = None;
        self.info_message = None;

        match self.auth.confirm_password_reset(token, new_password).await {
            Ok(()) => self.info_message = Some(INFO_PASSWORD_CHANGED.to_string()),
            Err(e) => {
                tracing::warn!("Password reset confirmation error: {}", e);
                self.error = Some(format!("Password reset failed: {}", e));
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            user: self.user.clone(),
            points: self.points,
            error: self.error.clone(),
            info_message: self.info_message.clone(),
            theme: self.theme,
            pending_adjustment: self.pending_adjustment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalAuth;
    use crate::config::test_config;
    use crate::constants::{ERR_INIT_USER_DATA, ERR_INVALID_NUMBER, ERR_UPDATE_POINTS};
    use crate::db::DbError;
    use crate::store::{Document, Fields, RedbDocumentStore, StoreError};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Store wrapper whose writes can be switched to fail
    #[derive(Clone)]
    struct FlakyStore {
        inner: RedbDocumentStore,
        fail_writes: Arc<AtomicBool>,
    }

    fn backend_failure() -> StoreError {
        let err = serde_json::from_str::<Value>("{").unwrap_err();
        StoreError::Backend(DbError::from(err))
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(backend_failure())
            } else {
                Ok(())
            }
        }
    }

    impl DocumentStore for FlakyStore {
        async fn read_document(
            &self,
            collection: &str,
            key: &str,
        ) -> Result<Option<Document>, StoreError> {
            self.inner.read_document(collection, key).await
        }

        async fn write_document(
            &self,
            collection: &str,
            key: &str,
            fields: Fields,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner.write_document(collection, key, fields).await
        }

        async fn create_document(
            &self,
            collection: &str,
            key: &str,
            fields: Fields,
        ) -> Result<Option<Document>, StoreError> {
            self.check()?;
            self.inner.create_document(collection, key, fields).await
        }

        async fn update_field(
            &self,
            collection: &str,
            key: &str,
            field: &str,
            value: Value,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner.update_field(collection, key, field, value).await
        }

        async fn compare_and_set_field(
            &self,
            collection: &str,
            key: &str,
            field: &str,
            expected: Value,
            value: Value,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner
                .compare_and_set_field(collection, key, field, expected, value)
                .await
        }
    }

    struct Harness {
        _temp_dir: TempDir,
        auth: LocalAuth,
        store: FlakyStore,
    }

    impl Harness {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let db = crate::db::open_database(temp_dir.path().join("view.db")).unwrap();
            let auth = LocalAuth::new(db.clone(), &test_config());
            let store = FlakyStore {
                inner: RedbDocumentStore::new(db),
                fail_writes: Arc::new(AtomicBool::new(false)),
            };
            Self {
                _temp_dir: temp_dir,
                auth,
                store,
            }
        }

        fn view(&self) -> PointsView<LocalAuth, FlakyStore> {
            PointsView::new(self.auth.clone(), self.store.clone())
        }

        fn fail_writes(&self, fail: bool) {
            self.store.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_new_account_starts_at_zero() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sync_auth_state().await;
        assert!(view.snapshot().user.is_none());

        view.sign_up("new@example.com", "secret1").await;

        let snapshot = view.snapshot();
        assert_eq!(snapshot.user.as_ref().unwrap().email, "new@example.com");
        assert_eq!(snapshot.points, 0);
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_adjustment_scenarios() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sign_up("user@example.com", "secret1").await;

        view.adjust_points("10").await;
        assert_eq!(view.snapshot().points, 10);

        view.adjust_points("-15").await;
        assert_eq!(view.snapshot().points, 0);

        view.adjust_points("5").await;
        view.adjust_points("3").await;
        let snapshot = view.snapshot();
        assert_eq!(snapshot.points, 8);
        assert_eq!(snapshot.pending_adjustment, "");
    }

    #[tokio::test]
    async fn test_invalid_adjustment_keeps_balance() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sign_up("user@example.com", "secret1").await;
        view.adjust_points("7").await;

        view.adjust_points("abc").await;

        let snapshot = view.snapshot();
        assert_eq!(snapshot.points, 7);
        assert_eq!(snapshot.error.as_deref(), Some(ERR_INVALID_NUMBER));
        assert_eq!(snapshot.pending_adjustment, "abc");

        let uid = snapshot.user.unwrap().uid;
        assert_eq!(read_balance(&harness.store, &uid).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_empty_adjustment_is_ignored() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sign_up("user@example.com", "secret1").await;

        view.adjust_points("").await;

        let snapshot = view.snapshot();
        assert_eq!(snapshot.points, 0);
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_adjustment_when_logged_out_is_ignored() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sync_auth_state().await;

        view.adjust_points("5").await;

        assert_eq!(view.snapshot().points, 0);
        assert_eq!(view.snapshot().pending_adjustment, "");
    }

    #[tokio::test]
    async fn test_failed_write_resyncs_from_store() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sign_up("user@example.com", "secret1").await;
        view.adjust_points("4").await;

        harness.fail_writes(true);
        view.adjust_points("10").await;

        let snapshot = view.snapshot();
        assert_eq!(snapshot.points, 4);
        assert_eq!(snapshot.error.as_deref(), Some(ERR_UPDATE_POINTS));
        assert_eq!(snapshot.pending_adjustment, "10");
    }

    #[tokio::test]
    async fn test_stale_session_is_resynced_instead_of_overwriting() {
        let harness = Harness::new();
        let mut first = harness.view();
        first.sign_up("user@example.com", "secret1").await;

        let mut second = harness.view();
        second.login("user@example.com", "secret1").await;

        first.adjust_points("5").await;
        assert_eq!(first.snapshot().points, 5);

        // Second session still shows 0; its write must not clobber the 5
        second.adjust_points("3").await;
        let snapshot = second.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some(ERR_UPDATE_POINTS));
        assert_eq!(snapshot.points, 5);

        second.adjust_points("3").await;
        assert_eq!(second.snapshot().points, 8);
    }

    #[tokio::test]
    async fn test_failed_record_creation_stays_logged_in_at_zero() {
        let harness = Harness::new();
        let mut view = harness.view();

        harness.fail_writes(true);
        view.sign_up("user@example.com", "secret1").await;

        let snapshot = view.snapshot();
        assert!(snapshot.user.is_some());
        assert_eq!(snapshot.points, 0);
        assert_eq!(snapshot.error.as_deref(), Some(ERR_INIT_USER_DATA));
    }

    #[tokio::test]
    async fn test_relogin_restores_persisted_balance() {
        let harness = Harness::new();
        let mut view = harness.view();
        view.sign_up("user@example.com", "secret1").await;
        view.adjust_points("6").await;

        // Another session moves the balance while this one still shows 6
        let mut other = harness.view();
        other.login("user@example.com", "secret1").await;
        other.adjust_points("20").await;
        assert_eq!(view.snapshot().points, 6);

        view.logout().await;
        let snapshot = view.snapshot();
        assert!(snapshot.user.is_none());
        assert_eq!(snapshot.points, 0);

        view.login("user@example.com", "secret1").await;
        assert_eq!(view.snapshot().points, 26);
    }

    #[tokio::test]
    async fn test_auth_errors_are_prefixed_by_operation() {
        let harness = Harness::new();
        let mut view = harness.view();

        view.login("user@example.com", "secret1").await;
        assert_eq!(
            view.snapshot().error.as_deref(),
            Some("Login failed: Invalid email or password.")
        );

        view.sign_up("user@example.com", "123").await;
        assert_eq!(
            view.snapshot().error.as_deref(),
            Some("Sign up failed: Password should be at least 6 characters.")
        );
        assert!(view.snapshot().user.is_none());
    }

    #[tokio::test]
    async fn test_password_reset_messages() {
        let harness = Harness::new();
        let mut view = harness.view();

        view.password_reset("  ").await;
        assert_eq!(view.snapshot().error.as_deref(), Some(ERR_RESET_EMAIL_REQUIRED));
        assert_eq!(view.snapshot().info_message, None);

        view.password_reset("someone@example.com").await;
        assert_eq!(view.snapshot().error, None);
        assert_eq!(view.snapshot().info_message.as_deref(), Some(INFO_RESET_EMAIL_SENT));

        view.password_reset("bad-email").await;
        assert_eq!(
            view.snapshot().error.as_deref(),
            Some("Password reset failed: The email address is badly formatted.")
        );
        assert_eq!(view.snapshot().info_message, None);
    }

    #[tokio::test]
    async fn test_confirm_with_unknown_token_reports_error() {
        let harness = Harness::new();
        let mut view = harness.view();

        view.confirm_password_reset(&"a".repeat(64), "new-secret").await;
        assert_eq!(
            view.snapshot().error.as_deref(),
            Some("Password reset failed: The password reset link is invalid or has expired.")
        );
    }

    #[test]
    fn test_toggle_theme() {
        let harness = Harness::new();
        let mut view = harness.view();
        assert_eq!(view.snapshot().theme, Theme::Light);

        view.toggle_theme();
        assert_eq!(view.snapshot().theme, Theme::Dark);
        assert_eq!(Theme::Dark.toggle_label(), "Switch to Light Mode");

        view.toggle_theme();
        assert_eq!(view.snapshot().theme.as_str(), "light");
    }

    #[test]
    fn test_dropping_view_unregisters_subscription() {
        let harness = Harness::new();
        let view = harness.view();
        assert_eq!(view.auth().subscriber_count(), 1);

        let PointsView {
            auth, subscription, ..
        } = view;
        drop(subscription);
        assert_eq!(auth.subscriber_count(), 0);
    }
}
