//! OpenAI-compatible chat completions backend (DeepSeek by default)

use super::{RewriteRequest, Rewriter};
use crate::config::ServiceConfig;
use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client handle. Built once per run and shared by every chunk.
pub struct ChatCompletionsClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    /// Reads the API key from the configured environment variable. A missing
    /// key is a configuration error, reported before any chunk is sent.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CleanError::MissingCredential {
                var: config.api_key_env.clone(),
            })?;
        Ok(Self::new(api_key, config))
    }

    pub fn new(api_key: String, config: &ServiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Self {
            agent,
            endpoint: endpoint_for(&config.base_url),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        }
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Text of the first choice. A null or absent content is an empty reply,
/// which the cleaner treats as "no change".
fn extract_content(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CleanError::MalformedResponse("no choices in response".into()))?;
    Ok(choice.message.content.unwrap_or_default())
}

impl Rewriter for ChatCompletionsClient {
    fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String> {
        let body = self.request_body(&request.prompt);
        debug!(chunk = request.chunk_index, endpoint = %self.endpoint, model = %self.model, "sending chunk");
        trace!(prompt = %request.prompt, "rewrite prompt");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(&body);

        match response {
            Ok(response) => {
                let parsed: ChatResponse = response
                    .into_json()
                    .map_err(|e| CleanError::MalformedResponse(e.to_string()))?;
                extract_content(parsed)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!(chunk = request.chunk_index, status, "rewriting service rejected chunk");
                Err(CleanError::Api { status, body })
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(chunk = request.chunk_index, error = %transport, "rewriting service unreachable");
                Err(CleanError::Transport(transport.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}
