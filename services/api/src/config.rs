//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub upload_dir: PathBuf,
    pub google_api_key: String,
    pub groq_api_key: String,
    pub embedding_api_base: String,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub llm_api_base: String,
    pub qa_model: String,
    pub index_document_limit: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Load Server and Database Settings ---
        let bind_address = parse("BIND_ADDRESS", &var("BIND_ADDRESS", "0.0.0.0:3000"))?;
        let database_url = required("DATABASE_URL")?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let upload_dir = PathBuf::from(var("UPLOAD_DIR", "./uploaded_docs"));

        // --- Provider credentials: the service cannot answer anything without both ---
        let google_api_key = required("GOOGLE_API_KEY")?;
        let groq_api_key = required("GROQ_API_KEY")?;

        // --- Load Adapter-specific Settings ---
        let embedding_api_base = var(
            "EMBEDDING_API_BASE",
            "https://generativelanguage.googleapis.com/v1beta/openai",
        );
        let embedding_model = var("EMBEDDING_MODEL", "gemini-embedding-001");
        let embedding_batch_size = positive("EMBEDDING_BATCH_SIZE", &var("EMBEDDING_BATCH_SIZE", "100"))?;
        let llm_api_base = var("LLM_API_BASE", "https://api.groq.com/openai/v1");
        let qa_model = var("QA_MODEL", "llama3-8b-8192");

        // --- Index and retrieval ---
        let index_document_limit = positive("INDEX_DOCUMENT_LIMIT", &var("INDEX_DOCUMENT_LIMIT", "4"))?;
        let chunk_size = positive("CHUNK_SIZE", &var("CHUNK_SIZE", "1000"))?;
        let chunk_overlap: usize = parse("CHUNK_OVERLAP", &var("CHUNK_OVERLAP", "200"))?;
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "CHUNK_OVERLAP".to_string(),
                format!("must be smaller than CHUNK_SIZE ({})", chunk_size),
            ));
        }
        let retrieval_top_k = positive("RETRIEVAL_TOP_K", &var("RETRIEVAL_TOP_K", "4"))?;

        // --- Sessions and HTTP ---
        let session_ttl_days = positive("SESSION_TTL_DAYS", &var("SESSION_TTL_DAYS", "30"))? as i64;
        let cookie_secure = parse("COOKIE_SECURE", &var("COOKIE_SECURE", "true"))?;
        let cors_origin = var("CORS_ORIGIN", "http://localhost:3000");
        let max_upload_bytes = positive("MAX_UPLOAD_BYTES", &var("MAX_UPLOAD_BYTES", "67108864"))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            upload_dir,
            google_api_key,
            groq_api_key,
            embedding_api_base,
            embedding_model,
            embedding_batch_size,
            llm_api_base,
            qa_model,
            index_document_limit,
            chunk_size,
            chunk_overlap,
            retrieval_top_k,
            session_ttl_days,
            cookie_secure,
            cors_origin,
            max_upload_bytes,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn positive(key: &str, raw: &str) -> Result<usize, ConfigError> {
    match parse::<usize>(key, raw)? {
        0 => Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        n => Ok(n),
    }
}
