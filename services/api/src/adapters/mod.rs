pub mod db;
pub mod embeddings;
pub mod file_store;
pub mod pdf_loader;
pub mod qa_llm;

pub use db::DbAdapter;
pub use embeddings::OpenAiEmbeddingAdapter;
pub use file_store::LocalFileStore;
pub use pdf_loader::PdfDirectoryLoader;
pub use qa_llm::OpenAiQaAdapter;
