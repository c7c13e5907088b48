//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, plus the session cookie helpers
//! shared with the auth handlers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use pdf_qa_core::ports::PortError;
use std::sync::Arc;
use tracing::debug;

use crate::web::flash::WebError;
use crate::web::state::{AppState, CurrentUser};

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_PATH: &str = "/login";

/// Pulls the session id out of the `Cookie` header, if there is one.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

pub fn session_cookie(session_id: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        if secure { " Secure;" } else { "" },
        max_age_secs
    )
}

pub fn cleared_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Middleware that validates the session cookie.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If missing, unknown, or expired, redirects to the login page.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session_id) = session_id_from_headers(req.headers()).map(str::to_owned) else {
        debug!(path = %req.uri().path(), "No session cookie; redirecting to login");
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let user_id = match state.db.validate_auth_session(&session_id).await {
        Ok(user_id) => user_id,
        Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => {
            debug!(path = %req.uri().path(), "Stale session; redirecting to login");
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Err(e) => return WebError::from(e).into_response(),
    };

    req.extensions_mut().insert(CurrentUser {
        user_id,
        session_id,
    });

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_id_from_headers(&headers), Some("abc-123"));
    }

    #[test]
    fn empty_or_missing_session_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id_from_headers(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_id_from_headers(&headers), None);
    }

    #[test]
    fn cookie_attributes_follow_the_secure_flag() {
        let secure = session_cookie("id", 60, true);
        assert!(secure.starts_with("session=id; HttpOnly; Secure;"));
        assert!(secure.ends_with("Max-Age=60"));

        let plain = session_cookie("id", 60, false);
        assert!(!plain.contains("Secure"));
        assert!(plain.contains("SameSite=Lax"));

        assert!(cleared_session_cookie(false).starts_with("session=; "));
    }
}
