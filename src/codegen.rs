//! Code-generation service boundary.
//!
//! The service is text-in/text-out: a system prompt and a user prompt go in,
//! free-form text comes back. [`TestImprover`] owns prompt construction and
//! response parsing; transport and service failures never escape it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::Analysis;
use crate::config::Config;
use crate::improvement::Improvement;
use crate::output;
use crate::prompt;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request to generation service failed: {0}")]
    Transport(String),
    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode generation service response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// A blocking text completion service.
pub trait CodeGenerator {
    fn complete(&self, request: &GenerationRequest) -> Result<String, CodegenError>;
}

pub struct AnthropicClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, CodegenError> {
        Self::with_base_url(api_key, timeout, ANTHROPIC_API_BASE)
    }

    pub fn with_base_url(api_key: &str, timeout: Duration, base_url: &str) -> Result<Self, CodegenError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mutant-killer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CodegenError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl CodeGenerator for AnthropicClient {
    fn complete(&self, request: &GenerationRequest) -> Result<String, CodegenError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: MAX_TOKENS,
            system: &request.system_prompt,
            messages: vec![MessageParam {
                role: "user",
                content: &request.user_prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| CodegenError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CodegenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| CodegenError::Decode(e.to_string()))?;
        Ok(first_text_block(&parsed))
    }
}

fn first_text_block(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text.clone())
        .unwrap_or_default()
}

/// Turns an [`Analysis`] into an [`Improvement`] via a [`CodeGenerator`].
pub struct TestImprover {
    generator: Box<dyn CodeGenerator>,
    model: String,
    system_prompt: String,
    dry_run: bool,
    verbose: bool,
}

impl TestImprover {
    pub fn new(config: &Config, generator: Box<dyn CodeGenerator>) -> Self {
        TestImprover {
            generator,
            model: config.model().to_string(),
            system_prompt: config.system_prompt(),
            dry_run: config.dry_run(),
            verbose: config.verbose(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, CodegenError> {
        let client = AnthropicClient::new(config.api_key(), config.generation_timeout())?;
        Ok(Self::new(config, Box::new(client)))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// `Ok(None)` means the service answered but produced no usable code block.
    pub fn try_improve(&self, analysis: &Analysis) -> Result<Option<Improvement>, CodegenError> {
        let request = GenerationRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            user_prompt: prompt::build_prompt(analysis),
        };
        if self.verbose {
            output::print_info("Sending prompt to the generation service...");
        }
        tracing::debug!(class = %analysis.mutation.class, method = %analysis.mutation.method, prompt_len = request.user_prompt.len(), "requesting test improvement");

        let reply = self.generator.complete(&request)?;
        Ok(prompt::extract_code_block(&reply)
            .map(|code| Improvement::new(analysis.clone(), code, self.dry_run)))
    }

    /// Like [`try_improve`](Self::try_improve), but service failures are
    /// reported to the operator and folded into `None`.
    pub fn improve(&self, analysis: &Analysis) -> Option<Improvement> {
        match self.try_improve(analysis) {
            Ok(improvement) => improvement,
            Err(e) => {
                tracing::warn!(class = %analysis.mutation.class, method = %analysis.mutation.method, error = %e, "generation service call failed");
                output::print_error(&format!("Error calling generation service: {e}"));
                None
            }
        }
    }
}
