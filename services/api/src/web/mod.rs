pub mod auth;
pub mod flash;
pub mod middleware;
pub mod pages;
pub mod qa;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;

/// Builds every application route on top of the shared state.
///
/// CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(pages::index_handler))
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .route("/signup", get(auth::signup_page).post(auth::signup_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/logout", get(auth::logout_handler))
        .route("/protected", get(pages::protected_handler))
        .route("/upload", get(rest::upload_page).post(rest::upload_handler))
        .route(
            "/initialize_embeddings",
            get(rest::initialize_embeddings_handler),
        )
        .route(
            "/ask_question",
            get(qa::ask_page).post(qa::ask_question_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .with_state(app_state)
}
