use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::LocalAuth;
use crate::constants::SESSION_COOKIE;
use crate::store::RedbDocumentStore;
use crate::{AppState, Config};

pub type AppSession = crate::session::Session<LocalAuth, RedbDocumentStore>;

/// Read the session id from the request's `Cookie` headers
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Look up the caller's session, starting one if needed
pub fn resolve_session(state: &AppState, headers: &HeaderMap) -> AppSession {
    state.sessions.resolve(session_cookie(headers))
}

/// Look up the caller's session without starting one
pub fn lookup_session(state: &AppState, headers: &HeaderMap) -> Option<AppSession> {
    state.sessions.lookup(session_cookie(headers))
}

/// Attach the session cookie to a response when the session is new
fn with_session_cookie(
    mut response: Response,
    session: &AppSession,
    config: &Config,
) -> Response {
    if !session.is_new {
        return response;
    }

    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session.id
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }

    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Failed to build session cookie: {}", e),
    }
    response
}

/// Post/redirect/get: send the browser back to the page
pub fn back_to_page(session: &AppSession, config: &Config) -> Response {
    with_session_cookie(Redirect::to("/").into_response(), session, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; slaypoints_session=abc123; other=1"),
        );
        assert_eq!(session_cookie(&headers), Some("abc123"));
    }

    #[test]
    fn test_session_cookie_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("slaypoints_session=xyz"));
        assert_eq!(session_cookie(&headers), Some("xyz"));
    }
}
