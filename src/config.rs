//! Configuration types for statement parsing.
//!
//! Every knob lives in [`ParserConfig`], built via [`ParserConfigBuilder`].
//! The defaults reproduce the behaviour most callers want: Gemini
//! `gemini-1.5-flash`, credential from `GEMINI_API_KEY`, a two-minute
//! deadline per model call and two retries on transient failures.

use crate::error::BankParserError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable consulted when no API key is passed explicitly.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Base URL of the Gemini REST API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a [`crate::StatementParser`].
///
/// # Example
/// ```rust
/// use bank_parser::ParserConfig;
///
/// let config = ParserConfig::builder()
///     .api_key("my-key")
///     .max_retries(3)
///     .api_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 3);
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    /// Explicit Gemini API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable read when `api_key` is `None`. Default: `GEMINI_API_KEY`.
    pub api_key_env: String,

    /// Model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// Base URL of the Gemini REST API. Override to target a proxy.
    pub endpoint: String,

    /// `edgequake_llm` provider name ("openai", "anthropic", "ollama", …).
    /// When set, the call goes through `ProviderFactory` instead of the
    /// built-in Gemini client and `model` is passed to that provider.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction should be faithful to the statement, not creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A busy monthly statement easily produces a few hundred records; a
    /// truncated completion leaves an unterminated array behind.
    pub max_output_tokens: usize,

    /// Retries after a transient model failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Deadline for each model call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Password for encrypted statements.
    pub password: Option<String>,

    /// Directory containing the pdfium shared library. When `None`, the
    /// current directory and then the system library path are searched.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Observer notified as the pipeline advances.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_output_tokens: 8192,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ParserConfig {
    /// Create a new builder for `ParserConfig`.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key to use: the explicit one, else the configured variable.
    /// Empty values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// Builder for [`ParserConfig`].
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl fmt::Debug for ParserConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ParserConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParserConfig, BankParserError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(BankParserError::Configuration(
                "model name must not be empty".into(),
            ));
        }
        if c.endpoint.trim().is_empty() {
            return Err(BankParserError::Configuration(
                "endpoint must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(BankParserError::Configuration(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(BankParserError::Configuration(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ParserConfig::default();
        assert_eq!(c.model, "gemini-1.5-flash");
        assert_eq!(c.api_key_env, "GEMINI_API_KEY");
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.api_timeout_secs, 120);
        assert!(c.api_key.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ParserConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ParserConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, BankParserError::Configuration(_)));
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(ParserConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn explicit_key_wins_and_blank_key_is_ignored() {
        let c = ParserConfig::builder()
            .api_key("abc")
            .api_key_env("BANK_PARSER_CONFIG_TEST_UNSET")
            .build()
            .unwrap();
        assert_eq!(c.resolve_api_key().as_deref(), Some("abc"));

        let blank = ParserConfig::builder()
            .api_key("   ")
            .api_key_env("BANK_PARSER_CONFIG_TEST_UNSET")
            .build()
            .unwrap();
        assert_eq!(blank.resolve_api_key(), None);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = ParserConfig::builder()
            .api_key("super-secret")
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
