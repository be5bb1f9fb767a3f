//! Async client for the code synthesis completion provider
//!
//! Sends a single-turn prompt to an OpenAI-compatible chat completions
//! endpoint and returns the first candidate's text. The provider is only
//! asked to write code; interpreting spoken commands never goes through it.

use crate::core::config::SynthesisConfig;
use crate::core::error::{BridgeError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Status reported when the provider gave none (transport failure, timeout)
const DEFAULT_ERROR_STATUS: u16 = 500;

/// A request to synthesize code from a natural-language task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Anything that can turn a synthesis request into code
pub trait CodeSynthesizer {
    fn synthesize_code(
        &self,
        request: &SynthesisRequest,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Async client for the completion provider
pub struct SynthesisClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    default_max_tokens: u32,
    default_temperature: f32,
}

impl SynthesisClient {
    /// Create a new client with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {}", e)))?;
        let defaults = SynthesisConfig::default();
        Ok(Self {
            client,
            api_key,
            api_url,
            model,
            default_max_tokens: defaults.default_max_tokens,
            default_temperature: defaults.default_temperature,
        })
    }

    /// Create a client from the synthesis config section
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: &SynthesisConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BridgeError::Config("no completion provider API key set".into()))?;
        let mut client = Self::new(
            api_key,
            config.api_url.clone(),
            config.model.clone(),
            config.timeout(),
        )?;
        client.default_max_tokens = config.default_max_tokens;
        client.default_temperature = config.default_temperature;
        Ok(client)
    }

    /// Send a prompt and return the first candidate's text
    pub async fn synthesize(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::SynthesisUnavailable {
                status: status.as_u16(),
                message: provider_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(transport_error)?;
        completion.into_code().ok_or_else(|| BridgeError::SynthesisUnavailable {
            status: DEFAULT_ERROR_STATUS,
            message: "completion contained no candidate text".into(),
        })
    }

    /// Synthesize with the configured defaults for unset parameters
    pub async fn complete(&self, request: &SynthesisRequest) -> Result<String> {
        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        let temperature = request.temperature.unwrap_or(self.default_temperature);
        tracing::debug!(max_tokens, temperature, "requesting code synthesis");
        self.synthesize(&request.prompt, max_tokens, temperature).await
    }
}

impl CodeSynthesizer for SynthesisClient {
    async fn synthesize_code(&self, request: &SynthesisRequest) -> Result<String> {
        self.complete(request).await
    }
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    BridgeError::SynthesisUnavailable {
        status: e.status().map(|s| s.as_u16()).unwrap_or(DEFAULT_ERROR_STATUS),
        message: e.to_string(),
    }
}

/// Pull the provider's error message out of an error body
fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            let trimmed = body.trim();
            return (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
    };
    ["/error/message", "/error", "/message"]
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl CompletionResponse {
    /// First choice's message content, or its legacy `text` field
    fn into_code(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        choice.message.and_then(|m| m.content).or(choice.text)
    }
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
