//! Shared fixtures for the router tests: in-memory stand-ins for the database,
//! the PDF loader and both model providers.

#![allow(dead_code)]

use api_lib::adapters::LocalFileStore;
use api_lib::config::Config;
use api_lib::web::{self, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use pdf_qa_core::domain::{LoadedDocument, NewUser, User, UserCredentials};
use pdf_qa_core::ports::{
    DatabaseService, DocumentLoader, EmbeddingService, PortError, PortResult,
    QuestionAnsweringService,
};
use pdf_qa_core::{IndexSettings, IndexStore, TextSplitter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory Database
//=========================================================================================

struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
pub struct InMemoryDb {
    users: Mutex<Vec<StoredUser>>,
    sessions: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl InMemoryDb {
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.user.username == new_user.username || u.user.email == new_user.email)
        {
            return Err(PortError::Conflict("Username or email already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            username: new_user.username,
            email: new_user.email,
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.username == username)
            .map(|u| UserCredentials {
                user_id: u.user.id,
                username: u.user.username.clone(),
                password_hash: u.password_hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {}", username)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.sessions.lock().unwrap().get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

//=========================================================================================
// Loader and Model Fakes
//=========================================================================================

/// Reads every visible file in the upload directory as UTF-8 text.
pub struct TextDirectoryLoader {
    dir: PathBuf,
    pub loads: AtomicUsize,
}

#[async_trait]
impl DocumentLoader for TextDirectoryLoader {
    async fn load(&self) -> PortResult<Vec<LoadedDocument>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let mut paths: Vec<PathBuf> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        Ok(paths
            .into_iter()
            .map(|p| LoadedDocument {
                source: p.file_name().unwrap().to_string_lossy().into_owned(),
                text: String::from_utf8_lossy(&std::fs::read(&p).unwrap()).into_owned(),
            })
            .collect())
    }
}

pub const KEYWORDS: [&str; 4] = ["refund", "shipping", "warranty", "privacy"];

/// One dimension per keyword, counting occurrences.
pub struct KeywordEmbedder {
    pub batches: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| lower.matches(*k).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Answers with a fixed string and remembers what it was asked.
#[derive(Default)]
pub struct RecordingQa {
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl QuestionAnsweringService for RecordingQa {
    async fn answer_question(&self, question: &str, context: &str) -> PortResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), context.to_string()));
        Ok(format!("Answer to: {}", question))
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub index: Arc<IndexStore>,
    pub loader: Arc<TextDirectoryLoader>,
    pub embedder: Arc<KeywordEmbedder>,
    pub qa: Arc<RecordingQa>,
    pub upload_dir: TempDir,
}

pub fn test_config(upload_dir: &std::path::Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("GOOGLE_API_KEY", "test-google-key".to_string()),
        ("GROQ_API_KEY", "test-groq-key".to_string()),
        ("UPLOAD_DIR", upload_dir.display().to_string()),
        ("COOKIE_SECURE", "false".to_string()),
        ("RETRIEVAL_TOP_K", "1".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        // Uploads land in a subdirectory that does not exist yet.
        let docs = upload_dir.path().join("uploaded_docs");
        let config = Arc::new(test_config(&docs));

        let db = Arc::new(InMemoryDb::default());
        let loader = Arc::new(TextDirectoryLoader {
            dir: docs.clone(),
            loads: AtomicUsize::new(0),
        });
        let embedder = Arc::new(KeywordEmbedder {
            batches: AtomicUsize::new(0),
        });
        let qa = Arc::new(RecordingQa::default());
        let index = Arc::new(IndexStore::new(
            loader.clone(),
            embedder.clone(),
            TextSplitter::new(config.chunk_size, config.chunk_overlap).unwrap(),
            IndexSettings {
                document_limit: config.index_document_limit,
                embedding_batch_size: config.embedding_batch_size,
            },
        ));

        let state = Arc::new(AppState {
            db: db.clone(),
            config,
            files: Arc::new(LocalFileStore::new(docs)),
            index: index.clone(),
            qa_adapter: qa.clone(),
        });

        Self {
            router: web::router(state),
            db,
            index,
            loader,
            embedder,
            qa,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Posts `(field, filename, contents)` parts as multipart/form-data.
    pub async fn upload(&self, parts: &[(&str, &str, &str)], cookie: &str) -> Response<Body> {
        let boundary = "----pdfqa-test-boundary";
        let mut body = String::new();
        for (field, filename, contents) in parts {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{contents}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Response<Body> {
        let body = format!(
            "name={username}+Tester&username={username}&email={username}%40example.com&password={password}"
        );
        self.post_form("/signup", &body, None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        let body = format!("username={username}&password={password}");
        self.post_form("/login", &body, None).await
    }

    /// Signs up and logs in, returning the `session=...` cookie pair.
    pub async fn logged_in(&self, username: &str) -> String {
        let response = self.signup(username, "pw123").await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = self.login(username, "pw123").await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

/// The `session=<id>` pair from a `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
