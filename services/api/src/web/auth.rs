//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Form, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use pdf_qa_core::domain::NewUser;
use pdf_qa_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::flash::{Flash, FlashBody, WebError};
use crate::web::middleware::{cleared_session_cookie, session_cookie};
use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub flash: Flash,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub flash: Flash,
}

/// Describes the form a client should render for GET /login and GET /signup.
#[derive(Serialize, ToSchema)]
pub struct FormDescriptor {
    pub action: String,
    pub method: String,
    pub content_type: String,
    pub fields: Vec<String>,
}

impl FormDescriptor {
    fn post_form(action: &str, fields: &[&str]) -> Self {
        Self {
            action: action.to_string(),
            method: "POST".to_string(),
            content_type: "application/x-www-form-urlencoded".to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

//=========================================================================================
// Password Hashing
//=========================================================================================

/// Hashes a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, WebError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WebError::Unexpected(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, WebError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| WebError::Unexpected(format!("Failed to parse password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /signup - Describe the signup form
#[utoipa::path(
    get,
    path = "/signup",
    responses((status = 200, description = "Signup form fields", body = FormDescriptor))
)]
pub async fn signup_page() -> Json<FormDescriptor> {
    Json(FormDescriptor::post_form(
        "/signup",
        &["name", "username", "email", "password"],
    ))
}

/// POST /signup - Create a new user account
#[utoipa::path(
    post,
    path = "/signup",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing form fields", body = FlashBody),
        (status = 409, description = "Username or email already exists", body = FlashBody),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Result<impl IntoResponse, WebError> {
    let Form(form) = form?;
    let password_hash = hash_password(&form.password)?;

    let user = state
        .db
        .create_user(NewUser {
            name: form.name,
            username: form.username,
            email: form.email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
            flash: Flash::success("Account created. Please log in."),
        }),
    ))
}

/// GET /login - Describe the login form
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form fields", body = FormDescriptor))
)]
pub async fn login_page() -> Json<FormDescriptor> {
    Json(FormDescriptor::post_form("/login", &["username", "password"]))
}

/// POST /login - Login with existing account
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful; sets the session cookie", body = AuthResponse),
        (status = 400, description = "Missing form fields", body = FlashBody),
        (status = 401, description = "Invalid username or password", body = FlashBody),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, WebError> {
    let Form(form) = form?;
    // 1. Look up the user. An unknown username fails the same way as a wrong password.
    let creds = match state.db.get_user_by_username(&form.username).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            warn!(username = %form.username, "Login for unknown username");
            return Err(WebError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !verify_password(&form.password, &creds.password_hash)? {
        warn!(username = %form.username, "Login with wrong password");
        return Err(WebError::InvalidCredentials);
    }

    // 3. Create the auth session
    let ttl = Duration::days(state.config.session_ttl_days);
    let auth_session_id = Uuid::new_v4().to_string();
    state
        .db
        .create_auth_session(&auth_session_id, creds.user_id, Utc::now() + ttl)
        .await?;

    info!(user_id = %creds.user_id, "User logged in");

    // 4. Return response with cookie
    let cookie = session_cookie(
        &auth_session_id,
        ttl.num_seconds(),
        state.config.cookie_secure,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: creds.user_id,
            username: creds.username,
            flash: Flash::success("Logged in successfully."),
        }),
    ))
}

/// GET /logout - End the current session
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 200, description = "Logout successful; clears the session cookie", body = LogoutResponse),
        (status = 303, description = "Not logged in; redirects to /login")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, WebError> {
    state.db.delete_auth_session(&current.session_id).await?;
    info!(user_id = %current.user_id, "User logged out");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie(state.config.cookie_secure))],
        Json(LogoutResponse {
            flash: Flash::success("You have been logged out."),
        }),
    ))
}
