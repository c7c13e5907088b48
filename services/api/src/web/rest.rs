//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for document upload and index building, and the
//! master definition for the OpenAPI specification.

use crate::adapters::file_store::sanitize_filename;
use crate::web::{auth, pages, qa};
use crate::web::flash::{Flash, FlashBody, FlashCategory, WebError};
use crate::web::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
};
use pdf_qa_core::index::BuildOutcome;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

/// The multipart field that carries uploaded documents.
pub const UPLOAD_FIELD: &str = "pdf_files";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        pages::index_handler,
        pages::protected_handler,
        auth::signup_page,
        auth::signup_handler,
        auth::login_page,
        auth::login_handler,
        auth::logout_handler,
        upload_page,
        upload_handler,
        initialize_embeddings_handler,
        qa::ask_page,
        qa::ask_question_handler,
    ),
    components(
        schemas(
            Flash,
            FlashBody,
            FlashCategory,
            auth::SignupForm,
            auth::LoginForm,
            auth::AuthResponse,
            auth::LogoutResponse,
            auth::FormDescriptor,
            pages::UserView,
            pages::LandingResponse,
            pages::ProtectedResponse,
            UploadPageResponse,
            UploadResponse,
            IndexResponse,
            qa::AskForm,
            qa::AskResponse,
        )
    ),
    tags(
        (name = "PDF Q&A API", description = "Upload PDFs, build the document index, and ask questions about them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UploadPageResponse {
    pub uploaded_files: Vec<String>,
}

/// The response payload sent after an upload.
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// How many files this request stored.
    pub saved: usize,
    pub uploaded_files: Vec<String>,
    pub flash: Flash,
}

#[derive(Serialize, ToSchema)]
pub struct IndexResponse {
    /// "empty", "building" or "ready".
    pub state: String,
    /// Documents indexed by this request; absent when the index already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    pub flash: Flash,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the files in the shared upload directory.
#[utoipa::path(
    get,
    path = "/upload",
    responses(
        (status = 200, description = "Uploaded filenames", body = UploadPageResponse),
        (status = 303, description = "Not logged in; redirects to /login")
    )
)]
pub async fn upload_page(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UploadPageResponse>, WebError> {
    let uploaded_files = app_state.files.list().await?;
    Ok(Json(UploadPageResponse { uploaded_files }))
}

/// Upload one or more documents.
///
/// Accepts a multipart/form-data request with any number of `pdf_files` parts.
/// A file with an existing name replaces it.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "One or more `pdf_files` parts."),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 303, description = "Not logged in; redirects to /login"),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, WebError> {
    let mut saved = 0;

    // A post without a multipart body carries zero files.
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(detail = %rejection.body_text(), "Upload without a multipart body");
            return upload_response(&app_state, 0).await;
        }
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::Unexpected(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        let Some(filename) = sanitize_filename(&raw_name).map(str::to_owned) else {
            if !raw_name.is_empty() {
                warn!(filename = %raw_name, "Skipping upload with unusable filename");
            }
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| WebError::Unexpected(format!("Failed to read file bytes: {}", e)))?;

        app_state.files.save(&filename, &data).await?;
        info!(filename = %filename, bytes = data.len(), "Stored uploaded file");
        saved += 1;
    }

    upload_response(&app_state, saved).await
}

async fn upload_response(app_state: &AppState, saved: usize) -> Result<Json<UploadResponse>, WebError> {
    let uploaded_files = app_state.files.list().await?;

    Ok(Json(UploadResponse {
        saved,
        uploaded_files,
        flash: Flash::success("Files uploaded successfully."),
    }))
}

/// Build the document index from the uploaded files.
///
/// Only the first time succeeds in building; later calls report the existing index.
#[utoipa::path(
    get,
    path = "/initialize_embeddings",
    responses(
        (status = 200, description = "Index is ready", body = IndexResponse),
        (status = 303, description = "Not logged in; redirects to /login"),
        (status = 422, description = "Not enough documents uploaded", body = FlashBody),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn initialize_embeddings_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<IndexResponse>, WebError> {
    let outcome = app_state.index.initialize().await?;
    let state = app_state.index.state().label().to_string();

    let response = match outcome {
        BuildOutcome::Built { documents, chunks } => IndexResponse {
            state,
            documents: Some(documents),
            chunks: Some(chunks),
            flash: Flash::success("Document embeddings have been initialized successfully."),
        },
        BuildOutcome::AlreadyReady => IndexResponse {
            state,
            documents: None,
            chunks: None,
            flash: Flash::success("Document embeddings are already initialized."),
        },
    };

    Ok(Json(response))
}
