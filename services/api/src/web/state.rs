//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use pdf_qa_core::index::IndexStore;
use pdf_qa_core::ports::{DatabaseService, FileStore, QuestionAnsweringService};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub files: Arc<dyn FileStore>,
    /// The document index; owned here instead of living in a global.
    pub index: Arc<IndexStore>,
    pub qa_adapter: Arc<dyn QuestionAnsweringService>,
}

//=========================================================================================
// CurrentUser (Per Request)
//=========================================================================================

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub session_id: String,
}
