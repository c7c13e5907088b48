//! crates/pdf_qa_core/src/index.rs
//!
//! The document index and its lifecycle.
//!
//! The index starts `Empty`, moves to `Building` while documents are loaded,
//! chunked and embedded, and ends `Ready`. A ready index is never rebuilt or
//! updated for the life of the process.
//!
//! Builds are single-flight and run on their own task. A trigger that arrives
//! while a build is running joins it and waits for its result. A build keeps
//! going when the request that started it is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::chunking::TextSplitter;
use crate::domain::Chunk;
use crate::ports::{DocumentLoader, EmbeddingService, PortError};
use crate::vector_index::VectorIndex;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    #[error("Not enough documents loaded: found {found}, need at least {required}")]
    InsufficientCorpus { found: usize, required: usize },
    #[error("The document index has not been built")]
    NotReady,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Tunables for building the index.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// How many loaded documents are indexed; fewer than this aborts the build.
    pub document_limit: usize,
    pub embedding_batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            document_limit: 4,
            embedding_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndexState {
    Empty,
    Building,
    Ready(Arc<VectorIndex>),
}

impl IndexState {
    pub fn label(&self) -> &'static str {
        match self {
            IndexState::Empty => "empty",
            IndexState::Building => "building",
            IndexState::Ready(_) => "ready",
        }
    }
}

/// What a call to [`IndexStore::initialize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { documents: usize, chunks: usize },
    AlreadyReady,
}

type BuildResult = Result<BuildOutcome, IndexError>;

/// Publishes a build's result once; `None` while it is still running.
type BuildWatch = watch::Receiver<Option<BuildResult>>;

pub struct IndexStore {
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn EmbeddingService>,
    splitter: TextSplitter,
    settings: IndexSettings,
    state: Arc<Mutex<IndexState>>,
    /// The most recent build. Locked only to join it or start the next one.
    in_flight: tokio::sync::Mutex<Option<BuildWatch>>,
}

impl IndexStore {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn EmbeddingService>,
        splitter: TextSplitter,
        settings: IndexSettings,
    ) -> Self {
        Self {
            loader,
            embedder,
            splitter,
            settings,
            state: Arc::new(Mutex::new(IndexState::Empty)),
            in_flight: tokio::sync::Mutex::new(None),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> IndexState {
        lock(&self.state).clone()
    }

    pub fn ready_index(&self) -> Result<Arc<VectorIndex>, IndexError> {
        match &*lock(&self.state) {
            IndexState::Ready(index) => Ok(Arc::clone(index)),
            _ => Err(IndexError::NotReady),
        }
    }

    /// Builds the index unless it is already built.
    ///
    /// Only the caller that started the build gets `Built`; callers that joined
    /// it get `AlreadyReady`. When a joined build fails, the joiner tries again
    /// with a build of its own.
    pub async fn initialize(&self) -> BuildResult {
        loop {
            if self.ready_index().is_ok() {
                return Ok(BuildOutcome::AlreadyReady);
            }

            let (mut build, started_here) = {
                let mut in_flight = self.in_flight.lock().await;
                if self.ready_index().is_ok() {
                    return Ok(BuildOutcome::AlreadyReady);
                }
                let running = in_flight.as_ref().filter(|build| is_running(build)).cloned();
                match running {
                    Some(build) => (build, false),
                    None => {
                        let build = self.spawn_build();
                        *in_flight = Some(build.clone());
                        (build, true)
                    }
                }
            };

            let finished: Option<BuildResult> = build
                .wait_for(Option::is_some)
                .await
                .map_err(|_| {
                    PortError::Unexpected("The index build stopped without a result".to_string())
                })?
                .clone();

            match finished {
                Some(Ok(outcome)) if started_here => return Ok(outcome),
                Some(Ok(_)) => return Ok(BuildOutcome::AlreadyReady),
                Some(Err(e)) if started_here => return Err(e),
                Some(Err(e)) => warn!(error = %e, "Joined index build failed; retrying"),
                None => {
                    return Err(PortError::Unexpected(
                        "The index build stopped without a result".to_string(),
                    )
                    .into())
                }
            }
        }
    }

    /// Embeds the question and returns the nearest chunks from the ready index.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<Chunk>, IndexError> {
        let index = self.ready_index()?;
        let query = self.embedder.embed(question).await?;
        let hits = index.search(&query, top_k)?;
        Ok(hits.into_iter().map(|hit| hit.chunk.clone()).collect())
    }

    /// Marks the state `Building` and starts the build on a detached task.
    fn spawn_build(&self) -> BuildWatch {
        let (tx, rx) = watch::channel(None);
        let guard = BuildingGuard::enter(Arc::clone(&self.state));
        let job = BuildJob {
            loader: Arc::clone(&self.loader),
            embedder: Arc::clone(&self.embedder),
            splitter: self.splitter.clone(),
            settings: self.settings.clone(),
        };

        tokio::spawn(async move {
            let result = job.run(guard).await;
            // Nobody listening is fine; the state already records the outcome.
            let _ = tx.send(Some(result));
        });
        rx
    }
}

fn is_running(build: &BuildWatch) -> bool {
    build.borrow().is_none() && build.has_changed().is_ok()
}

fn lock(state: &Mutex<IndexState>) -> MutexGuard<'_, IndexState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything one build needs, owned so it can outlive the request.
struct BuildJob {
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn EmbeddingService>,
    splitter: TextSplitter,
    settings: IndexSettings,
}

impl BuildJob {
    async fn run(self, mut guard: BuildingGuard) -> BuildResult {
        let (index, documents) = self.build().await?;
        let chunks = index.len();
        guard.finish(index);

        info!(documents, chunks, "Document index is ready");
        Ok(BuildOutcome::Built { documents, chunks })
    }

    async fn build(&self) -> Result<(VectorIndex, usize), IndexError> {
        let mut documents = self.loader.load().await?;
        let required = self.settings.document_limit;
        if documents.len() < required {
            warn!(found = documents.len(), required, "Not enough documents to build the index");
            return Err(IndexError::InsufficientCorpus {
                found: documents.len(),
                required,
            });
        }
        documents.truncate(required);

        let chunks = self.splitter.split_documents(&documents);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.settings.embedding_batch_size.max(1)) {
            let vectors = self.embedder.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(PortError::Unexpected(format!(
                    "Embedding service returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                ))
                .into());
            }
            embeddings.extend(vectors);
        }

        let index = VectorIndex::from_embeddings(chunks, embeddings)?;
        Ok((index, documents.len()))
    }
}

/// Holds the state at `Building`; dropping it without `finish` (a failed or
/// panicked build) puts the state back to `Empty`.
struct BuildingGuard {
    state: Arc<Mutex<IndexState>>,
    finished: bool,
}

impl BuildingGuard {
    fn enter(state: Arc<Mutex<IndexState>>) -> Self {
        *lock(&state) = IndexState::Building;
        Self {
            state,
            finished: false,
        }
    }

    fn finish(&mut self, index: VectorIndex) {
        *lock(&self.state) = IndexState::Ready(Arc::new(index));
        self.finished = true;
    }
}

impl Drop for BuildingGuard {
    fn drop(&mut self) {
        if !self.finished {
            *lock(&self.state) = IndexState::Empty;
        }
    }
}
