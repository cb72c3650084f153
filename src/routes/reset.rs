use axum::{
    extract::{Form, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::session::{back_to_page, lookup_session, resolve_session};
use crate::error::{AppError, Result};
use crate::render::render_reset_form;
use crate::security::validate_token;
use crate::view::Theme;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetLinkParams {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirmForm {
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// Form reached from the emailed reset link
///
/// GET /reset-password/confirm?token=<token>
pub async fn show_reset_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ResetLinkParams>,
) -> Result<Response> {
    if !validate_token(&params.token) {
        return Err(AppError::InvalidInput("Invalid reset token format".to_string()));
    }

    let theme = match lookup_session(&state, &headers) {
        Some(session) => {
            let view = session.view.lock().await;
            view.snapshot().theme
        }
        None => Theme::default(),
    };

    Ok(Html(render_reset_form(theme, &params.token)).into_response())
}

/// Set the new password, then show the outcome on the main page
///
/// POST /reset-password/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ResetConfirmForm>,
) -> Response {
    let session = resolve_session(&state, &headers);
    session
        .view
        .lock()
        .await
        .confirm_password_reset(&form.token, &form.password)
        .await;
    back_to_page(&session, &state.config)
}
