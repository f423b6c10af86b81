//! Model interaction: send the prompt, get completion text back.
//!
//! [`TextModel`] is the seam between the pipeline and whatever hosts the
//! model. Two implementations ship with the crate:
//!
//! * [`GeminiModel`]: direct REST call to Google's `generateContent`
//!   endpoint, authenticated with an API key;
//! * [`ProviderModel`]: adapter over any `edgequake_llm` provider, for
//!   callers who prefer OpenAI, Anthropic, Ollama, …
//!
//! ## Retry Strategy
//!
//! [`generate_with_retry`] wraps every call in a deadline and retries
//! transient failures (see [`ModelError::is_transient`]) with exponential
//! backoff: `retry_backoff_ms * 2^(attempt-1)`. With the defaults (500 ms,
//! 2 retries) a flaky endpoint costs at most 1.5 s of waiting. Permanent
//! failures such as a rejected API key surface immediately.

use crate::config::ParserConfig;
use crate::error::{BankParserError, ModelError};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Text returned by one model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A hosted text-in / text-out model.
pub trait TextModel: Send + Sync {
    /// Human-readable identifier for logs, e.g. `gemini/gemini-1.5-flash`.
    fn name(&self) -> &str;

    /// Send `prompt` and return the completion.
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, ModelError>>;
}

/// Pick the model backend for `config`, from most to least specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`): created through
///    [`ProviderFactory::create_llm_provider`] with `config.model`; the
///    factory reads that provider's own API key variable.
/// 3. **Gemini**: with `config.api_key`, else the variable named by
///    `config.api_key_env` (`GEMINI_API_KEY` by default).
///
/// Fails with [`BankParserError::Configuration`] when none applies.
pub fn resolve_model(config: &ParserConfig) -> Result<Arc<dyn TextModel>, BankParserError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderModel::new(
            Arc::clone(provider),
            "custom",
            config,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            BankParserError::Configuration(format!(
                "LLM provider '{}' is not configured: {}",
                name, e
            ))
        })?;
        return Ok(Arc::new(ProviderModel::new(provider, name, config)));
    }

    let api_key = config.resolve_api_key().ok_or_else(|| {
        BankParserError::Configuration(format!(
            "API key required. Either pass it explicitly or set the {} environment variable",
            config.api_key_env
        ))
    })?;
    Ok(Arc::new(GeminiModel::new(api_key, config)?))
}

/// Call `model` under the configured deadline and retry policy.
///
/// Returns the completion together with the number of attempts made.
pub async fn generate_with_retry(
    model: &dyn TextModel,
    prompt: &str,
    config: &ParserConfig,
) -> Result<(Completion, u32), BankParserError> {
    let max_attempts = config.max_retries.saturating_add(1);
    let deadline = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<ModelError> = None;

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                model.name(),
                attempt,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_model_request(attempt + 1, max_attempts);
        }

        let result = match timeout(deadline, model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                secs: config.api_timeout_secs,
            }),
        };

        match result {
            Ok(completion) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {} chars",
                    model.name(),
                    completion.input_tokens,
                    completion.output_tokens,
                    completion.text.len()
                );
                return Ok((completion, attempt + 1));
            }
            Err(e) if e.is_transient() => {
                warn!("{}: attempt {} failed — {}", model.name(), attempt + 1, e);
                last_err = Some(e);
            }
            Err(e) => {
                warn!("{}: permanent failure — {}", model.name(), e);
                return Err(BankParserError::ModelCall {
                    attempts: attempt + 1,
                    detail: e.to_string(),
                });
            }
        }
    }

    Err(match last_err {
        Some(ModelError::Timeout { secs }) => BankParserError::ModelTimeout {
            attempts: max_attempts,
            secs,
        },
        Some(e) => BankParserError::ModelCall {
            attempts: max_attempts,
            detail: e.to_string(),
        },
        None => BankParserError::ModelCall {
            attempts: 0,
            detail: "no attempt was made".into(),
        },
    })
}

/// Delay before retry number `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    if base_ms == 0 {
        return 0;
    }
    2u64.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base_ms.checked_mul(factor))
        .unwrap_or(u64::MAX)
}

// ── Gemini REST client ───────────────────────────────────────────────────

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    label: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: usize,
    timeout_secs: u64,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, config: &ParserConfig) -> Result<Self, BankParserError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| BankParserError::Configuration(format!("HTTP client: {}", e)))?;

        info!("Using Gemini model {}", config.model);
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            label: format!("gemini/{}", config.model),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn call(&self, prompt: &str) -> Result<Completion, ModelError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Http {
                status: status.as_u16(),
                body: raw,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        parsed.into_completion()
    }
}

impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, ModelError>> {
        Box::pin(self.call(prompt))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GenerateResponse {
    fn into_completion(self) -> Result<Completion, ModelError> {
        let (input_tokens, output_tokens) = self
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((0, 0));

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".into());
            return Err(ModelError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "empty candidate".into());
            return Err(ModelError::EmptyResponse(reason));
        }

        Ok(Completion {
            text,
            input_tokens,
            output_tokens,
        })
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter exposing an `edgequake_llm` provider as a [`TextModel`].
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: &str, config: &ParserConfig) -> Self {
        info!("Using {} provider with model {}", label, config.model);
        Self {
            provider,
            label: format!("{}/{}", label, config.model),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_output_tokens),
                ..Default::default()
            },
        }
    }
}

impl TextModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, ModelError>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::user(prompt)];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| ModelError::Provider(e.to_string()))?;

            Ok(Completion {
                text: response.content,
                input_tokens: response.prompt_tokens as usize,
                output_tokens: response.completion_tokens as usize,
            })
        })
    }
}
