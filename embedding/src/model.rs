use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{EmbeddingError, Vector};

/// The embedding model contract (C2): an opaque `text -> vector` function
/// with an optional batch mode, treated as an external collaborator.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn generate(&self, text: &str) -> Result<Vector, EmbeddingError>;
    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingError>;
    fn dimension(&self) -> usize;
    fn supports_batch(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP-backed embedding model: `POST <host>/api/embeddings` for a single
/// prompt, `POST <host>/api/embed` for a batch. Every returned vector is
/// L2-normalised before use.
pub struct HttpEmbeddingModel {
    client: reqwest::Client,
    host: String,
    model_name: String,
    dimension: usize,
}

impl HttpEmbeddingModel {
    pub fn new(host: impl Into<String>, model_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into(),
            model_name: model_name.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    async fn generate(&self, text: &str) -> Result<Vector, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.host);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingsRequest {
                model: &self.model_name,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Network(format!(
                "embedding model returned {}",
                response.status()
            )));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        Ok(normalize(body.embedding))
    }

    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingError> {
        let url = format!("{}/api/embed", self.host);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model_name,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Network(format!(
                "embedding model returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        Ok(body.embeddings.into_iter().map(normalize).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// L2-normalises a vector; the all-zero vector is returned unchanged since
/// it has no direction to normalise toward.
pub fn normalize(mut vector: Vector) -> Vector {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vector() {
        let v = normalize(vec![3.0, 4.0, 0.0]);
        assert!((v[0] - 0.6).abs() < 1e-5);
        assert!((v[1] - 0.8).abs() < 1e-5);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn normalize_leaves_zero_vector_unchanged() {
        let v = normalize(vec![0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
