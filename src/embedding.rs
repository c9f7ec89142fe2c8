//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and two concrete backends:
//! - **ollama** — calls a local Ollama `/api/embeddings` endpoint, one
//!   request per text.
//! - **openai** — calls an OpenAI-compatible `/embeddings` endpoint with
//!   batching, retry, and exponential backoff. The base URL and the name
//!   of the API-key environment variable both come from configuration, so
//!   compatible servers work without code changes.
//!
//! Also provides the vector utilities used by the SQLite index:
//! [`vec_to_blob`] / [`blob_to_vec`] for little-endian f32 BLOB storage
//! and [`cosine_similarity`] for brute-force nearest-neighbor scoring.
//!
//! Retry strategy (openai): HTTP 429 and 5xx retry with backoff capped at
//! 2^5 seconds; other 4xx fail immediately; network errors retry.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Create the provider named by the configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaEmbedding::new(config)?)),
        "openai" => Ok(Box::new(OpenAiEmbedding::new(config)?)),
        "disabled" => bail!("Embedding provider is disabled. Set [embedding] provider in config."),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";

/// Check a returned vector against the configured dimensionality.
fn ensure_dims(expected: Option<usize>, got: usize) -> Result<()> {
    if let Some(expected) = expected {
        if got != expected {
            bail!("Embedding has {} dimensions, expected {}", got, expected);
        }
    }
    Ok(())
}

// ============ Ollama provider ============

/// Local Ollama embeddings. The endpoint takes one prompt per request, so
/// batches are embedded sequentially.
pub struct OllamaEmbedding {
    base_url: String,
    model: String,
    dims: Option<usize>,
    timeout_secs: u64,
}

impl OllamaEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for ollama provider"))?;
        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            dims: config.dims,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({
                "model": self.model,
                "prompt": text,
            });

            let response = client
                .post(format!("{}/api/embeddings", self.base_url))
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body_text = response.text().await.unwrap_or_default();
                bail!("Ollama embeddings error {}: {}", status, body_text);
            }

            let json: serde_json::Value = response.json().await?;
            let embedding = json
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embedding"))?;

            let vec: Vec<f32> = embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            ensure_dims(self.dims, vec.len())?;
            vectors.push(vec);
        }

        Ok(vectors)
    }
}

// ============ OpenAI-compatible provider ============

/// OpenAI-compatible embeddings endpoint with batching and retry.
///
/// The API key is read from the environment variable named by
/// `embedding.api_key_env`.
#[derive(Debug)]
pub struct OpenAiEmbedding {
    base_url: String,
    model: String,
    api_key: String,
    dims: Option<usize>,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for openai provider"))?;

        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            api_key,
            dims: config.dims,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/embeddings", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_openai_response(&json, self.dims);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

fn parse_openai_response(
    json: &serde_json::Value,
    expected_dims: Option<usize>,
) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        ensure_dims(expected_dims, vec.len())?;

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_disabled_provider_errors() {
        let config = EmbeddingConfig::default();
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_ensure_dims() {
        assert!(ensure_dims(None, 7).is_ok());
        assert!(ensure_dims(Some(7), 7).is_ok());
        assert!(ensure_dims(Some(8), 7).is_err());
    }

    #[test]
    fn test_parse_openai_response_checks_dims() {
        let json = serde_json::json!({ "data": [{ "embedding": [0.1, 0.2] }] });
        assert_eq!(parse_openai_response(&json, None).unwrap().len(), 1);
        assert!(parse_openai_response(&json, Some(2)).is_ok());
        assert!(parse_openai_response(&json, Some(3)).is_err());
    }

    #[test]
    fn test_openai_key_read_from_configured_env_var() {
        let mut config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            ..EmbeddingConfig::default()
        };

        config.api_key_env = "PAPERBASE_TEST_ABSENT_KEY".to_string();
        let err = OpenAiEmbedding::new(&config).unwrap_err();
        assert!(err.to_string().contains("PAPERBASE_TEST_ABSENT_KEY"));

        std::env::set_var("PAPERBASE_TEST_PRESENT_KEY", "k");
        config.api_key_env = "PAPERBASE_TEST_PRESENT_KEY".to_string();
        config.base_url = Some("http://localhost:8080/v1/".to_string());
        assert!(OpenAiEmbedding::new(&config).is_ok());
    }
}
