//! Embedding service and the reference-example store built on it.
//!
//! The embedder is an injected collaborator: `HttpEmbedder` talks to a
//! text-embeddings endpoint, `HashEmbedder` is a deterministic local fallback
//! used when no endpoint is configured.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod store;

pub use store::{ExampleRetriever, InMemoryExampleStore};

pub const LOCAL_EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Text in, one vector per text out. Order of the output matches the input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            got: 0,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

/// Client for a text-embeddings-inference style `/embed` endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
}

impl HttpEmbedder {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { inputs: texts })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        debug!("Embedded {} texts", texts.len());
        Ok(vectors)
    }
}

/// Hashed word and word-bigram features, L2-normalised.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0_f32; self.dimensions];
        for feature in features(text) {
            let hash = stable_hash(&feature);
            let index = (hash as usize) % self.dimensions;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
            vector[index] += sign * weight;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(LOCAL_EMBEDDING_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn features(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();

    let mut features = Vec::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn normalize(values: &mut [f32]) {
    let norm = values
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt() as f32;
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Cosine similarity in [-1, 1]; 0.0 for mismatched, empty or zero vectors.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let (mut dot, mut left_sq, mut right_sq) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (l, r) in left.iter().zip(right) {
        let (l, r) = (f64::from(*l), f64::from(*r));
        dot += l * r;
        left_sq += l * l;
        right_sq += r * r;
    }

    if left_sq == 0.0 || right_sq == 0.0 {
        return 0.0;
    }
    dot / (left_sq.sqrt() * right_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_is_deterministic_and_normalised() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed_text("Backend Developer");
        let b = embedder.embed_text("backend developer!");
        assert_eq!(a, b, "case and punctuation should not change features");

        let norm: f64 = a.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_empty_text_is_zero_vector() {
        let vector = HashEmbedder::new(16).embed_text("   ");
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_cosine_similarity_identical_and_related() {
        let embedder = HashEmbedder::default();
        let engineer = embedder.embed_text("software engineer");
        assert!((cosine_similarity(&engineer, &engineer) - 1.0).abs() < 1e-6);

        let related = embedder.embed_text("senior software engineer");
        let unrelated = embedder.embed_text("pastry chef");
        assert!(cosine_similarity(&engineer, &related) > cosine_similarity(&engineer, &unrelated));
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_embed_one_returns_single_vector() {
        let embedder = HashEmbedder::new(32);
        let vector = embedder.embed_one("data engineer").await.unwrap();
        assert_eq!(vector.len(), 32);
    }
}
