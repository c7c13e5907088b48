//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the PDF question-answering service: the
//! session routes (`/signup`, `/login`, `/logout`), document upload,
//! `/initialize_embeddings` and `/ask_question`.
//!
//! Usage: `openapi [OUTPUT]`, where OUTPUT defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

/// Renders `api_doc` as pretty JSON at `path`.
fn write_document(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let path_count = api_doc.paths.paths.len();
    std::fs::write(path, api_doc.to_pretty_json()?)?;
    println!("Wrote {} paths to {}", path_count, path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    write_document(ApiDoc::openapi(), &path)?;
    Ok(())
}
