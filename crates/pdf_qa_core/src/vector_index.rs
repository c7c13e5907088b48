//! In-memory flat vector index over document chunks.
//!
//! Search is exhaustive: every stored vector is compared with the query by
//! squared Euclidean distance. The corpus is capped at a handful of documents,
//! so a linear scan is all the structure needed.

use crate::domain::Chunk;
use crate::ports::{PortError, PortResult};

#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// A chunk returned by [`VectorIndex::search`] with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub chunk: &'a Chunk,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimensions: usize,
}

impl VectorIndex {
    /// Pairs each chunk with its embedding. All embeddings must share one dimension.
    pub fn from_embeddings(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> PortResult<Self> {
        if chunks.len() != embeddings.len() {
            return Err(PortError::Unexpected(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(PortError::Unexpected(format!(
                "Embedding {} has {} dimensions, expected {}",
                bad,
                embeddings[bad].len(),
                dimensions
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        Ok(Self {
            entries,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct source filenames in the index, sorted.
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.entries.iter().map(|e| e.chunk.source.clone()).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Returns up to `top_k` chunks nearest to `query`, closest first.
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> PortResult<Vec<SearchHit<'_>>> {
        if self.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(PortError::Unexpected(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .entries
            .iter()
            .map(|e| SearchHit {
                chunk: &e.chunk,
                distance: squared_l2(query, &e.embedding),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, ordinal: u32) -> Chunk {
        Chunk {
            source: source.to_string(),
            ordinal,
            text: format!("{source}#{ordinal}"),
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_embeddings(
            vec![chunk("a.pdf", 0), chunk("a.pdf", 1), chunk("b.pdf", 0)],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();

        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["a.pdf#0", "b.pdf#0"]);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::from_embeddings(
            vec![chunk("x", 0), chunk("x", 1), chunk("x", 2)],
            vec![vec![1.0], vec![1.0], vec![1.0]],
        )
        .unwrap();
        let ordinals: Vec<u32> = index
            .search(&[0.0], 3)
            .unwrap()
            .iter()
            .map(|h| h.chunk.ordinal)
            .collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_k_larger_than_index() {
        assert_eq!(sample_index().search(&[0.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let built = VectorIndex::from_embeddings(
            vec![chunk("a", 0), chunk("a", 1)],
            vec![vec![1.0, 2.0], vec![1.0]],
        );
        assert!(built.is_err());

        assert!(sample_index().search(&[1.0, 2.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_rejects_missing_embeddings() {
        let built = VectorIndex::from_embeddings(vec![chunk("a", 0)], vec![]);
        assert!(built.is_err());
    }

    #[test]
    fn test_empty_index_returns_no_hits() {
        let index = VectorIndex::from_embeddings(vec![], vec![]).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_sources_are_distinct_and_sorted() {
        assert_eq!(sample_index().sources(), vec!["a.pdf", "b.pdf"]);
    }
}
