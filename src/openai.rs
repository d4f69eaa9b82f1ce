//! OpenAI chat.completions backend.
//!
//! Every request asks for a strict `json_schema` response format, so the model
//! is held to the same schema the reply is validated against afterwards.
//! Logs carry model, schema name and token usage. Keys and prompt bodies are
//! never logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::GenerationError;
use crate::generation::{GenerationBackend, StructuredRequest};
use crate::util::trunc_for_log;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_FAST_MODEL: &str = "gpt-4o-mini";
const DEFAULT_STRONG_MODEL: &str = "gpt-4o";

fn env_nonblank(key: &str) -> Option<String> {
  std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// `None` when OPENAI_API_KEY is unset or blank.
  pub fn from_env() -> Option<Self> {
    let api_key = env_nonblank("OPENAI_API_KEY")?;
    let base_url = env_nonblank("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());

    let client = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| warn!(target: "careersim_backend", error = %e, "HTTP client build failed, generation disabled"))
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url: base_url.trim_end_matches('/').to_string(),
      fast_model: env_nonblank("OPENAI_FAST_MODEL").unwrap_or_else(|| DEFAULT_FAST_MODEL.into()),
      strong_model: env_nonblank("OPENAI_STRONG_MODEL").unwrap_or_else(|| DEFAULT_STRONG_MODEL.into()),
    })
  }

  /// JSON-schema chat completion. Returns the raw content of the first choice.
  #[instrument(level = "info", target = "generation", skip(self, req), fields(model = %req.model, schema = req.schema.name))]
  async fn chat_structured(&self, req: &StructuredRequest<'_>) -> Result<String, GenerationError> {
    let res = self.client
      .post(format!("{}/chat/completions", self.base_url))
      .header(USER_AGENT, concat!("careersim-backend/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&chat_request(req))
      .send()
      .await?;

    let status = res.status();
    if !status.is_success() {
      let raw = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&raw).unwrap_or_else(|| trunc_for_log(&raw, 300));
      return Err(GenerationError::Api { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "generation", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let choice = body.choices.into_iter().next().ok_or(GenerationError::Empty)?;
    if let Some(refusal) = choice.message.refusal {
      debug!(target: "generation", refusal = %trunc_for_log(&refusal, 200), "Model refused");
      return Err(GenerationError::Empty);
    }
    Ok(choice.message.content.unwrap_or_default())
  }
}

#[async_trait]
impl GenerationBackend for OpenAI {
  async fn generate(&self, req: &StructuredRequest<'_>) -> Result<String, GenerationError> {
    self.chat_structured(req).await
  }

  fn name(&self) -> &'static str { "openai" }
}

fn chat_request<'a>(req: &StructuredRequest<'a>) -> ChatRequest<'a> {
  ChatRequest {
    model: req.model,
    messages: [
      Message { role: "system", content: req.system },
      Message { role: "user", content: req.instruction },
    ],
    response_format: ResponseFormat {
      kind: "json_schema",
      json_schema: JsonSchemaFormat {
        name: &req.schema.wire_name,
        strict: true,
        schema: &req.schema.json,
      },
    },
  }
}

// Wire types. Requests borrow from the caller; responses keep only what is read.

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: [Message<'a>; 2],
  response_format: ResponseFormat<'a>,
}
#[derive(Serialize)]
struct Message<'a> { role: &'static str, content: &'a str }
#[derive(Serialize)]
struct ResponseFormat<'a> {
  #[serde(rename = "type")] kind: &'static str,
  json_schema: JsonSchemaFormat<'a>,
}
#[derive(Serialize)]
struct JsonSchemaFormat<'a> { name: &'a str, strict: bool, schema: &'a Value }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<Choice>,
  #[serde(default)] usage: Option<TokenUsage>,
}
#[derive(Deserialize)]
struct Choice { message: ReplyMessage }
#[derive(Deserialize)]
struct ReplyMessage {
  content: Option<String>,
  #[serde(default)] refusal: Option<String>,
}
#[derive(Deserialize)]
struct TokenUsage {
  prompt_tokens: Option<u32>,
  completion_tokens: Option<u32>,
  total_tokens: Option<u32>,
}

/// `error.message` from an OpenAI error body, if the body has that shape.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct Body { error: Detail }
  #[derive(Deserialize)]
  struct Detail { message: String }
  serde_json::from_str::<Body>(body).ok().map(|b| b.error.message)
}
