//! OpenAI-compatible chat-completions client using reqwest.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::contexts::{CompletionModel, CompletionRequest, ModelError};

/// Blocking HTTP client for `POST {api_base}/chat/completions`.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ChatCompletionsClient {
    /// # Arguments
    /// * `api_base` - e.g. `https://api.together.xyz/v1`
    /// * `api_key` - Sent as a bearer token
    /// * `timeout` - `None` waits for the provider indefinitely
    pub fn new(api_base: &str, api_key: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Client(e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionModel for ChatCompletionsClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        let body = ApiRequest {
            model: &request.model,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            stop: &request.stop,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::EmptyCompletion)
    }
}
