pub mod chunking;
pub mod domain;
pub mod index;
pub mod ports;
pub mod rag;
pub mod vector_index;

pub use chunking::{ChunkConfigError, TextSplitter};
pub use domain::{Answer, AuthSession, Chunk, LoadedDocument, NewUser, User, UserCredentials};
pub use index::{BuildOutcome, IndexError, IndexSettings, IndexState, IndexStore};
pub use ports::{
    DatabaseService, DocumentLoader, EmbeddingService, FileStore, PortError, PortResult,
    QuestionAnsweringService,
};
pub use vector_index::{SearchHit, VectorIndex};
