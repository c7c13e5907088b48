//! crates/pdf_qa_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{LoadedDocument, NewUser, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Inserts a user. Returns `PortError::Conflict` when the username or email is taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to its user. Missing or expired sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    /// Deleting a session that no longer exists succeeds.
    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// Durable storage for uploaded files, shared by all users.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes `contents` under `filename`, replacing any file of the same name.
    async fn save(&self, filename: &str, contents: &[u8]) -> PortResult<()>;

    /// Names of the stored files, sorted. Empty when nothing was ever stored.
    async fn list(&self) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Loads every document currently in storage, in a stable order.
    async fn load(&self) -> PortResult<Vec<LoadedDocument>>;
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds each text; the output holds one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> PortResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| PortError::Unexpected("Embedding service returned no vector".to_string()))
    }
}

#[async_trait]
pub trait QuestionAnsweringService: Send + Sync {
    /// Answers a question based on a provided context.
    async fn answer_question(&self, question: &str, context: &str) -> PortResult<String>;
}
