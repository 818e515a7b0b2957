use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{env_opt, env_or};
use crate::errors::LlmError;

/// Configuration for LLM service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Total attempts per request; 1 means no retry.
    pub max_retries: u32,
    pub requests_per_hour: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "gemini".to_string(),
            api_key: None,
            model: None,
            max_tokens: 500,
            temperature: 0.7,
            max_retries: 1,
            requests_per_hour: 50,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("LLM_ENABLED", defaults.enabled),
            provider: env_or("LLM_PROVIDER", defaults.provider),
            api_key: env_opt("LLM_API_KEY"),
            model: env_opt("LLM_MODEL"),
            max_tokens: env_or("LLM_MAX_TOKENS", defaults.max_tokens),
            temperature: env_or("LLM_TEMPERATURE", defaults.temperature),
            max_retries: env_or("LLM_MAX_RETRIES", defaults.max_retries),
            requests_per_hour: env_or("LLM_REQUESTS_PER_HOUR", defaults.requests_per_hour),
            timeout_secs: env_or("LLM_TIMEOUT_SECS", defaults.timeout_secs),
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt` under the given system instruction
    async fn generate_completion(&self, system_prompt: &str, prompt: &str)
        -> Result<String, LlmError>;
}

fn build_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::NetworkError(e.to_string()))
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::NetworkError(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();

    if status == 429 {
        return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
    }

    Ok(response)
}

// ==============================================================================
// Gemini
// ==============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    max_retries: u32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }

    async fn call_gemini(&self, request: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)
            .await?
            .json::<GeminiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_completion(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let response = with_retry("Gemini", self.max_retries, || self.call_gemini(&request)).await?;

        if let Some(usage) = &response.usage_metadata {
            info!(
                "LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

        Ok(text)
    }
}

// ==============================================================================
// OpenAI
// ==============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    max_retries: u32,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key,
            model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }

    async fn call_openai(&self, request: &OpenAiRequest) -> Result<OpenAiResponse, LlmError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)
            .await?
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_completion(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = with_retry("OpenAI", self.max_retries, || self.call_openai(&request)).await?;

        if let Some(usage) = &response.usage {
            info!(
                "LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Run `call` up to `max_attempts` times with exponential backoff (1s, 2s, 4s, ...).
async fn with_retry<T, F, Fut>(name: &str, max_attempts: u32, mut call: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = Duration::from_secs(1);

    loop {
        match call().await {
            Ok(response) => return Ok(response),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    error!("{} API call failed after {} attempt(s): {}", name, attempt, e);
                    return Err(e);
                }

                warn!(
                    "{} API call failed (attempt {}/{}): {}. Retrying in {:?}...",
                    name, attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

// ==============================================================================
// Rate limiting
// ==============================================================================

/// Rate limit tracker for a user
#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: usize,
    window_start: Instant,
}

/// Per-user hourly rate limiter for interactive LLM use
pub struct RateLimiter {
    limits: Arc<RwLock<HashMap<Uuid, RateLimitEntry>>>,
    max_requests_per_hour: usize,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests_per_hour: usize) -> Self {
        Self {
            limits: Arc::new(RwLock::new(HashMap::new())),
            max_requests_per_hour,
            window_duration: Duration::from_secs(3600),
        }
    }

    pub async fn check_and_increment(&self, user_id: Uuid) -> Result<(), LlmError> {
        let mut limits = self.limits.write().await;
        let now = Instant::now();

        let entry = limits.entry(user_id).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests_per_hour {
            warn!("LLM rate limit exceeded for user: {}", user_id);
            return Err(LlmError::RateLimited);
        }

        entry.count += 1;
        info!(
            "LLM request count for user {}: {}/{}",
            user_id, entry.count, self.max_requests_per_hour
        );

        Ok(())
    }

    pub async fn cleanup_expired(&self) {
        let mut limits = self.limits.write().await;
        let now = Instant::now();
        let initial_count = limits.len();
        limits.retain(|_, v| now.duration_since(v.window_start) < self.window_duration);
        let removed_count = initial_count - limits.len();
        if removed_count > 0 {
            info!("Cleaned up {} expired rate limit entries", removed_count);
        }
    }
}

// ==============================================================================
// Service
// ==============================================================================

/// LLM service with provider abstraction and per-user rate limiting
pub struct LlmService {
    provider: Option<Arc<dyn LlmProvider>>,
    rate_limiter: RateLimiter,
}

impl LlmService {
    pub fn new(config: &LlmConfig) -> Self {
        let provider = if config.enabled {
            match config.api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(api_key) => {
                    info!("Initializing LLM service with provider: {}", config.provider);
                    let built = match config.provider.to_lowercase().as_str() {
                        "gemini" => GeminiProvider::new(api_key.to_string(), config)
                            .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
                        "openai" => OpenAiProvider::new(api_key.to_string(), config)
                            .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
                        other => Err(LlmError::ApiError(format!("Unknown LLM provider: {}", other))),
                    };
                    match built {
                        Ok(provider) => Some(provider),
                        Err(e) => {
                            warn!("{}. LLM features disabled.", e);
                            None
                        }
                    }
                }
                None => {
                    warn!("LLM API key not configured. LLM features disabled.");
                    None
                }
            }
        } else {
            info!("LLM features are disabled in configuration");
            None
        };

        Self {
            provider,
            rate_limiter: RateLimiter::new(config.requests_per_hour),
        }
    }

    /// Build a service around an already constructed provider
    pub fn with_provider(provider: Arc<dyn LlmProvider>, requests_per_hour: usize) -> Self {
        Self {
            provider: Some(provider),
            rate_limiter: RateLimiter::new(requests_per_hour),
        }
    }

    pub fn disabled() -> Self {
        Self {
            provider: None,
            rate_limiter: RateLimiter::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Completion on behalf of an interactive user, subject to the hourly limit
    pub async fn generate_completion_for_user(
        &self,
        user_id: Uuid,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let provider = self.provider.as_ref().ok_or(LlmError::Disabled)?;
        self.rate_limiter.check_and_increment(user_id).await?;
        provider.generate_completion(system_prompt, prompt).await
    }

    /// Completion without rate limiting, for background composition
    pub async fn generate_completion(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let provider = self.provider.as_ref().ok_or(LlmError::Disabled)?;
        provider.generate_completion(system_prompt, prompt).await
    }

    pub async fn cleanup(&self) {
        self.rate_limiter.cleanup_expired().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate_completion(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_llm_service_disabled_by_default() {
        let service = LlmService::new(&LlmConfig::default());
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_unknown_provider_disables_service() {
        let config = LlmConfig {
            enabled: true,
            provider: "mystery".to_string(),
            api_key: Some("key".to_string()),
            ..LlmConfig::default()
        };
        assert!(!LlmService::new(&config).is_enabled());
    }

    #[test]
    fn test_enabled_without_key_is_disabled() {
        let config = LlmConfig {
            enabled: true,
            api_key: Some(String::new()),
            ..LlmConfig::default()
        };
        assert!(!LlmService::new(&config).is_enabled());
    }

    #[tokio::test]
    async fn test_llm_service_returns_disabled_error() {
        let service = LlmService::disabled();
        let result = service.generate_completion("sys", "test").await;
        assert!(matches!(result, Err(LlmError::Disabled)));
    }

    #[tokio::test]
    async fn test_user_completion_is_rate_limited() {
        let service = LlmService::with_provider(Arc::new(EchoProvider), 1);
        let user = Uuid::new_v4();
        assert_eq!(
            service.generate_completion_for_user(user, "sys", "halo").await.unwrap(),
            "halo"
        );
        assert!(matches!(
            service.generate_completion_for_user(user, "sys", "halo").await,
            Err(LlmError::RateLimited)
        ));
        // Background completions are not limited.
        assert!(service.generate_completion("sys", "halo").await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new(3);
        let user_id = Uuid::new_v4();

        assert!(limiter.check_and_increment(user_id).await.is_ok());
        assert!(limiter.check_and_increment(user_id).await.is_ok());
        assert!(limiter.check_and_increment(user_id).await.is_ok());
        assert!(matches!(
            limiter.check_and_increment(user_id).await,
            Err(LlmError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LlmError> = with_retry("test", 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Timeout) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LlmError::NetworkError("reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
