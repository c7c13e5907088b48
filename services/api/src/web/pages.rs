//! services/api/src/web/pages.rs
//!
//! The landing page and the logged-in welcome page.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use pdf_qa_core::domain::User;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::flash::{FlashBody, WebError};
use crate::web::middleware::session_id_from_headers;
use crate::web::state::{AppState, CurrentUser};

/// The public view of a user. Never carries the password hash.
#[derive(Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LandingResponse {
    pub message: String,
    /// The logged-in user, when the request carries a live session.
    pub user: Option<UserView>,
}

#[derive(Serialize, ToSchema)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: UserView,
}

/// GET / - Public landing page
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = LandingResponse))
)]
pub async fn index_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<LandingResponse> {
    let user = match session_id_from_headers(&headers) {
        Some(session_id) => current_user(&state, session_id).await,
        None => None,
    };

    Json(LandingResponse {
        message: "Ask questions about your PDF documents.".to_string(),
        user,
    })
}

/// Resolves a session to its user for the public page. Any failure means "anonymous".
async fn current_user(state: &AppState, session_id: &str) -> Option<UserView> {
    let user_id = state.db.validate_auth_session(session_id).await.ok()?;
    match state.db.get_user_by_id(user_id).await {
        Ok(user) => Some(user.into()),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Session points at a missing user");
            None
        }
    }
}

/// GET /protected - Welcome page for logged-in users
#[utoipa::path(
    get,
    path = "/protected",
    responses(
        (status = 200, description = "The logged-in user", body = ProtectedResponse),
        (status = 303, description = "Not logged in; redirects to /login"),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn protected_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ProtectedResponse>, WebError> {
    let user = state.db.get_user_by_id(current.user_id).await?;

    Ok(Json(ProtectedResponse {
        message: format!("Welcome, {}!", user.name),
        user: user.into(),
    }))
}
