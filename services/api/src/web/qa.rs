//! services/api/src/web/qa.rs
//!
//! The question-answering page.

use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use pdf_qa_core::rag;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::flash::{Flash, FlashBody, WebError};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AskForm {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AskResponse {
    /// "empty", "building" or "ready".
    pub index_state: String,
    pub uploaded_files: Vec<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    /// Files the answer's context came from, nearest first.
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// Show the index state and the uploaded files.
#[utoipa::path(
    get,
    path = "/ask_question",
    responses(
        (status = 200, description = "Current state; no question asked", body = AskResponse),
        (status = 303, description = "Not logged in; redirects to /login")
    )
)]
pub async fn ask_page(State(state): State<Arc<AppState>>) -> Result<Json<AskResponse>, WebError> {
    Ok(Json(AskResponse {
        index_state: state.index.state().label().to_string(),
        uploaded_files: state.files.list().await?,
        question: None,
        answer: None,
        sources: Vec::new(),
        flash: None,
    }))
}

/// Ask a question about the indexed documents.
#[utoipa::path(
    post,
    path = "/ask_question",
    request_body(content = AskForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "The answer", body = AskResponse),
        (status = 303, description = "Not logged in; redirects to /login"),
        (status = 400, description = "Blank question", body = FlashBody),
        (status = 409, description = "Index not built yet", body = FlashBody),
        (status = 500, description = "Internal server error", body = FlashBody)
    )
)]
pub async fn ask_question_handler(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AskForm>, FormRejection>,
) -> Result<Json<AskResponse>, WebError> {
    let Form(form) = form?;
    state.index.ready_index()?;

    // Blank means whitespace only; a real question is passed on as typed.
    let question = form
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| WebError::InvalidInput("Please enter a question.".to_string()))?;

    let answer = rag::answer_question(
        &state.index,
        state.qa_adapter.as_ref(),
        &question,
        state.config.retrieval_top_k,
    )
    .await?;
    info!(sources = ?answer.sources, "Answered question");

    Ok(Json(AskResponse {
        index_state: state.index.state().label().to_string(),
        uploaded_files: state.files.list().await?,
        question: Some(answer.question),
        answer: Some(answer.answer),
        sources: answer.sources,
        flash: None,
    }))
}
