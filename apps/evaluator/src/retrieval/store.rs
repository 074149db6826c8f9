use std::sync::Arc;

use async_trait::async_trait;

use super::{cosine_similarity, Embedder, EmbeddingError};

/// Query text + question bucket → up to `limit` nearest reference texts.
#[async_trait]
pub trait ExampleRetriever: Send + Sync {
    async fn similar_examples(
        &self,
        bucket: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, EmbeddingError>;
}

#[derive(Debug, Clone)]
struct StoredExample {
    bucket: i64,
    text: String,
    vector: Vec<f32>,
}

/// Reference examples embedded once at construction and queried by cosine similarity.
pub struct InMemoryExampleStore {
    embedder: Arc<dyn Embedder>,
    examples: Vec<StoredExample>,
}

impl InMemoryExampleStore {
    pub fn empty(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            examples: Vec::new(),
        }
    }

    /// Embeds every `(bucket, text)` pair in one batch.
    pub async fn build(
        embedder: Arc<dyn Embedder>,
        examples: Vec<(i64, String)>,
    ) -> Result<Self, EmbeddingError> {
        if examples.is_empty() {
            return Ok(Self::empty(embedder));
        }

        let texts: Vec<String> = examples.iter().map(|(_, text)| text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        let examples: Vec<StoredExample> = examples
            .into_iter()
            .zip(vectors)
            .map(|((bucket, text), vector)| StoredExample {
                bucket,
                text,
                vector,
            })
            .collect();

        Ok(Self { embedder, examples })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }
}

#[async_trait]
impl ExampleRetriever for InMemoryExampleStore {
    async fn similar_examples(
        &self,
        bucket: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, EmbeddingError> {
        if limit == 0 || !self.examples.iter().any(|e| e.bucket == bucket) {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;

        let mut ranked: Vec<(f64, &StoredExample)> = self
            .examples
            .iter()
            .filter(|example| example.bucket == bucket)
            .map(|example| (cosine_similarity(&query_vector, &example.vector), example))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, example)| example.text.clone())
            .collect())
    }
}
