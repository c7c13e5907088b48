//! Retrieval-augmented answering: nearest chunks in, model answer out.

use tracing::debug;

use crate::domain::{Answer, Chunk};
use crate::index::{IndexError, IndexStore};
use crate::ports::QuestionAnsweringService;

/// Joins retrieved chunk texts into the context block handed to the model.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Retrieves context for `question` from the index and asks the model.
/// Every call goes to the model; answers are not cached.
pub async fn answer_question(
    index: &IndexStore,
    qa: &dyn QuestionAnsweringService,
    question: &str,
    top_k: usize,
) -> Result<Answer, IndexError> {
    let chunks = index.retrieve(question, top_k).await?;
    debug!(retrieved = chunks.len(), "Retrieved context for question");

    let context = build_context(&chunks);
    let answer = qa.answer_question(question, &context).await?;

    let mut sources: Vec<String> = Vec::new();
    for chunk in &chunks {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }

    Ok(Answer {
        question: question.to_string(),
        answer,
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextSplitter;
    use crate::domain::LoadedDocument;
    use crate::index::IndexSettings;
    use crate::ports::{DocumentLoader, EmbeddingService, PortResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Docs(Vec<LoadedDocument>);

    #[async_trait]
    impl DocumentLoader for Docs {
        async fn load(&self) -> PortResult<Vec<LoadedDocument>> {
            Ok(self.0.clone())
        }
    }

    /// One dimension per keyword.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingService for KeywordEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    ["rust", "python", "ocean", "desert"]
                        .iter()
                        .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingQa {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl QuestionAnsweringService for RecordingQa {
        async fn answer_question(&self, question: &str, context: &str) -> PortResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((question.to_string(), context.to_string()));
            Ok(format!("answer to {question}"))
        }
    }

    fn doc(source: &str, text: &str) -> LoadedDocument {
        LoadedDocument {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    fn ready_store() -> IndexStore {
        IndexStore::new(
            Arc::new(Docs(vec![
                doc("lang.pdf", "rust is a systems language"),
                doc("snake.pdf", "python is a snake"),
                doc("sea.pdf", "the ocean is deep"),
                doc("sand.pdf", "the desert is dry"),
            ])),
            Arc::new(KeywordEmbedder),
            TextSplitter::new(1000, 200).unwrap(),
            IndexSettings::default(),
        )
    }

    #[test]
    fn test_build_context_joins_with_blank_lines() {
        let chunks = vec![
            Chunk {
                source: "a".to_string(),
                ordinal: 0,
                text: "first".to_string(),
            },
            Chunk {
                source: "b".to_string(),
                ordinal: 0,
                text: "second".to_string(),
            },
        ];
        assert_eq!(build_context(&chunks), "first\n\nsecond");
    }

    #[tokio::test]
    async fn test_answer_uses_nearest_chunk_as_context() {
        let store = ready_store();
        store.initialize().await.unwrap();
        let qa = RecordingQa::default();

        let answer = answer_question(&store, &qa, "tell me about rust", 1)
            .await
            .unwrap();

        assert_eq!(answer.question, "tell me about rust");
        assert_eq!(answer.answer, "answer to tell me about rust");
        assert_eq!(answer.sources, vec!["lang.pdf"]);
        let calls = qa.calls.lock().unwrap();
        assert_eq!(calls[0].1, "rust is a systems language");
    }

    #[tokio::test]
    async fn test_repeated_questions_call_the_model_each_time() {
        let store = ready_store();
        store.initialize().await.unwrap();
        let qa = RecordingQa::default();

        answer_question(&store, &qa, "ocean?", 4).await.unwrap();
        answer_question(&store, &qa, "ocean?", 4).await.unwrap();
        assert_eq!(qa.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_ready_makes_no_model_call() {
        let store = ready_store();
        let qa = RecordingQa::default();

        let err = answer_question(&store, &qa, "ocean?", 4).await.unwrap_err();
        assert!(matches!(err, IndexError::NotReady));
        assert!(qa.calls.lock().unwrap().is_empty());
    }
}
