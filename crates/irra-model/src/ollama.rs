//! Ollama HTTP providers for text completion and embeddings.
//!
//! Both talk to the non-streaming JSON endpoints:
//! `POST {base}/api/generate` and `POST {base}/api/embed`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CompletionConfig, EmbeddingConfig};
use crate::error::{ModelError, ModelResult};
use crate::{CompletionModel, EmbeddingModel};

const PROVIDER: &str = "ollama";

fn http_client(timeout_secs: u64) -> ModelResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ModelError::ProviderNotAvailable {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// POST `body` and return the raw response text of a 2xx reply.
fn post_json<B: Serialize>(client: &Client, url: &str, body: &B) -> Result<String, String> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .map_err(|e| format!("request to {url} failed: {e}"))?;

    let status = response.status();
    let text = response.text().map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("{url} returned {status}: {text}"));
    }
    Ok(text)
}

// ============================================================================
// Completion
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Extract the generated text from an `/api/generate` reply.
pub(crate) fn parse_generate_response(body: &str) -> ModelResult<String> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|r| r.response)
        .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))
}

/// Completion model served by an Ollama instance.
#[derive(Debug)]
pub struct OllamaCompletionModel {
    client: Client,
    config: CompletionConfig,
}

impl OllamaCompletionModel {
    pub fn new(config: &CompletionConfig) -> ModelResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config: config.clone(),
        })
    }
}

impl CompletionModel for OllamaCompletionModel {
    fn complete(&self, prompt: &str) -> ModelResult<String> {
        let url = endpoint(&self.config.base_url, "api/generate");
        debug!(
            "Completion via {} (model={}, temperature={})",
            url, self.config.model, self.config.temperature
        );

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let body = post_json(&self.client, &url, &request)
            .map_err(|e| ModelError::completion_failed(&self.config.model, e))?;
        parse_generate_response(&body)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Embeddings
// ============================================================================

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Extract and check vectors from an `/api/embed` reply.
pub(crate) fn parse_embed_response(
    body: &str,
    expected_count: usize,
    dimension: usize,
) -> ModelResult<Vec<Vec<f32>>> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

    if parsed.embeddings.len() != expected_count {
        return Err(ModelError::invalid_response(
            PROVIDER,
            format!(
                "expected {} embeddings, got {}",
                expected_count,
                parsed.embeddings.len()
            ),
        ));
    }
    if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != dimension) {
        return Err(ModelError::invalid_response(
            PROVIDER,
            format!(
                "embedding dimension {} does not match configured {}",
                bad.len(),
                dimension
            ),
        ));
    }
    Ok(parsed.embeddings)
}

/// Embedding model served by an Ollama instance.
#[derive(Debug)]
pub struct OllamaEmbeddingModel {
    client: Client,
    config: EmbeddingConfig,
}

impl OllamaEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config: config.clone(),
        })
    }
}

impl EmbeddingModel for OllamaEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = endpoint(&self.config.base_url, "api/embed");
        debug!("Embedding {} texts via {}", texts.len(), url);

        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };
        let body = post_json(&self.client, &url, &request)
            .map_err(|e| ModelError::embedding_failed(&self.config.model, e))?;
        parse_embed_response(&body, texts.len(), self.config.dimension)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
