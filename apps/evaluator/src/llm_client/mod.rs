//! Text-generation client. Every generation call in the service goes through here.
//!
//! No other module talks to the generation endpoint directly. Callers depend on the
//! `TextGenerator` trait so tests can substitute a scripted fake.
//!
//! At most one generation is in flight per process: the endpoint serves one model
//! instance and queues badly under concurrent load.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub mod prompts;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM output contains no JSON object")]
    MissingObject,

    #[error("Generation client is not initialized")]
    NotInitialized,
}

/// Text in, continuation text out. No structure is guaranteed on the output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn initialize(&self) -> Result<(), LlmError>;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    async fn shutdown(&self);
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    pub return_full_text: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.1,
            top_p: 0.9,
            do_sample: true,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// The endpoint answers with either a single object or a one-element batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Single(GeneratedText),
    Batch(Vec<GeneratedText>),
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        match self {
            GenerateResponse::Single(output) => Some(output.generated_text),
            GenerateResponse::Batch(outputs) => {
                outputs.into_iter().next().map(|output| output.generated_text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateErrorBody {
    error: String,
}

/// HTTP client for a text-generation-inference style endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    parameters: GenerationParameters,
    permit: Arc<Semaphore>,
    ready: Arc<AtomicBool>,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            parameters: GenerationParameters::default(),
            permit: Arc::new(Semaphore::new(1)),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// One generation call. Retries on 429 (rate limit) and 5xx errors with
    /// exponential backoff.
    async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            inputs: prompt,
            parameters: &self.parameters,
        };
        let url = format!("{}/generate", self.base_url);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Generation attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .request(self.client.post(&url))
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Generation endpoint returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GenerateErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let output: GenerateResponse = response.json().await?;
            let text = output
                .into_text()
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .ok_or(LlmError::EmptyContent)?;

            debug!("Generation succeeded: {} chars", text.len());
            return Ok(text);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    /// Probes the endpoint's health route and marks the client ready.
    async fn initialize(&self) -> Result<(), LlmError> {
        let response = self
            .request(self.client.get(format!("{}/health", self.base_url)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        self.ready.store(true, Ordering::Release);
        info!("Generation endpoint ready at {}", self.base_url);
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if !self.is_ready() {
            return Err(LlmError::NotInitialized);
        }

        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|_| LlmError::NotInitialized)?;

        // Shutdown may have happened while this call was queued.
        if !self.is_ready() {
            return Err(LlmError::NotInitialized);
        }

        self.call(prompt).await
    }

    /// Rejects new calls and waits for the in-flight one to finish.
    async fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        let _drained = self.permit.acquire().await;
        info!("Generation client shut down");
    }
}

/// Deserializes the first JSON object in free-form model output.
///
/// Everything before the first `{` is ignored, and so is anything after the object
/// closes (code fences, trailing commentary).
pub fn parse_first_object<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let start = text.find('{').ok_or(LlmError::MissingObject)?;
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<T>();
    match stream.next() {
        Some(result) => result.map_err(LlmError::Parse),
        None => Err(LlmError::MissingObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_first_object_skips_preamble() {
        let value: Value = parse_first_object("Sure! Here it is: {\"grade\": \"긍정\"}").unwrap();
        assert_eq!(value["grade"], "긍정");
    }

    #[test]
    fn test_parse_first_object_inside_code_fence() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        let value: Value = parse_first_object(input).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_parse_first_object_ignores_trailing_text() {
        let input = "{\"summary\": \"ok\"}\n\nLet me know if you need more.";
        let value: Value = parse_first_object(input).unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn test_parse_first_object_without_brace() {
        let result = parse_first_object::<Value>("I cannot evaluate this answer.");
        assert!(matches!(result, Err(LlmError::MissingObject)));
    }

    #[test]
    fn test_parse_first_object_truncated() {
        let result = parse_first_object::<Value>("{\"summary\": \"cut off");
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_generate_response_shapes() {
        let single: GenerateResponse =
            serde_json::from_str(r#"{"generated_text": "hello"}"#).unwrap();
        let batch: GenerateResponse =
            serde_json::from_str(r#"[{"generated_text": "hi"}]"#).unwrap();
        let empty: GenerateResponse = serde_json::from_str("[]").unwrap();

        assert_eq!(single.into_text().as_deref(), Some("hello"));
        assert_eq!(batch.into_text().as_deref(), Some("hi"));
        assert_eq!(empty.into_text(), None);
    }

    #[test]
    fn test_default_parameters_serialize() {
        let value = serde_json::to_value(GenerationParameters::default()).unwrap();
        assert_eq!(value["max_new_tokens"], 512);
        assert_eq!(value["do_sample"], true);
        assert_eq!(value["return_full_text"], false);
    }

    #[tokio::test]
    async fn test_generate_before_initialize_fails() {
        let client = LlmClient::new("http://127.0.0.1:9", None);
        let result = client.generate("prompt").await;
        assert!(matches!(result, Err(LlmError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_client_not_ready() {
        let client = LlmClient::new("http://127.0.0.1:9", None);
        client.ready.store(true, Ordering::Release);
        client.shutdown().await;
        assert!(!client.is_ready());
        assert!(matches!(
            client.generate("prompt").await,
            Err(LlmError::NotInitialized)
        ));
    }
}
