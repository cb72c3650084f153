use axum::{
    extract::{Form, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::session::{back_to_page, lookup_session, resolve_session};
use crate::render::render_page;
use crate::view::ViewSnapshot;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustForm {
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    #[serde(default)]
    pub email: String,
}

/// Render the page for the caller's session
///
/// Visitors without a session get the signed-out page; a session is only
/// started by a form post.
///
/// GET /
pub async fn show_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let snapshot = match lookup_session(&state, &headers) {
        Some(session) => {
            let mut view = session.view.lock().await;
            view.sync_auth_state().await;
            view.snapshot()
        }
        None => ViewSnapshot::default(),
    };

    Html(render_page(&snapshot)).into_response()
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.login(&form.email, &form.password).await;
    back_to_page(&session, &state.config)
}

/// POST /signup
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.sign_up(&form.email, &form.password).await;
    back_to_page(&session, &state.config)
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.logout().await;
    back_to_page(&session, &state.config)
}

/// POST /adjust
pub async fn adjust_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AdjustForm>,
) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.adjust_points(&form.amount).await;
    back_to_page(&session, &state.config)
}

/// POST /reset-password
pub async fn request_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ResetRequestForm>,
) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.password_reset(&form.email).await;
    back_to_page(&session, &state.config)
}

/// POST /theme
pub async fn toggle_theme(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = resolve_session(&state, &headers);
    session.view.lock().await.toggle_theme();
    back_to_page(&session, &state.config)
}
