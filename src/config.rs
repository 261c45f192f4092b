use std::env;
use std::fmt;
use std::time::Duration;

use tracing::warn;

const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);
const INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocks at or below this many chars are too short to classify.
pub const MIN_BLOCK_CHARS: usize = 50;
/// Scraped text shorter than this is replaced by the fallback instructions.
pub const MIN_CORPUS_CHARS: usize = 200;
/// Corpus budget, keeping the prompt within the model's input limit.
pub const MAX_CORPUS_CHARS: usize = 8000;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const TEMPERATURE: f32 = 0.7;

/// Process-wide settings, read once at startup.
///
/// Environment variables:
/// - `AWS_REGION`, `CLAUDE_MODEL_ID`, `AWS_BEARER_TOKEN_BEDROCK`: inference backend.
///   Only Bedrock API keys are supported; the SigV4 credential chain
///   (`AWS_ACCESS_KEY_ID`, profiles) is not consulted.
/// - `BEDROCK_ENDPOINT`: overrides the regional Bedrock runtime endpoint
/// - `POLYGLOT_MAX_TOKENS`: output token budget (default 512)
/// - `POLYGLOT_SEARCH_URL`: search results page (default Google)
#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub corpus: CorpusPolicy,
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub min_block_chars: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusPolicy {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for CorpusPolicy {
    fn default() -> Self {
        Self {
            min_chars: MIN_CORPUS_CHARS,
            max_chars: MAX_CORPUS_CHARS,
        }
    }
}

/// Inference settings. Missing values are reported when the backend is
/// called, not here.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub region: Option<String>,
    pub model_id: Option<String>,
    pub api_key: Option<ApiKey>,
    pub endpoint: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_tokens = match var("POLYGLOT_MAX_TOKENS").map(|v| v.parse::<u32>()) {
            Some(Ok(n)) if n > 0 => n,
            Some(_) => {
                warn!(default = DEFAULT_MAX_TOKENS, "invalid POLYGLOT_MAX_TOKENS, using default");
                DEFAULT_MAX_TOKENS
            }
            None => DEFAULT_MAX_TOKENS,
        };

        Self {
            search: SearchConfig {
                base_url: var("POLYGLOT_SEARCH_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
                min_block_chars: MIN_BLOCK_CHARS,
                timeout: SEARCH_TIMEOUT,
            },
            corpus: CorpusPolicy::default(),
            inference: InferenceConfig {
                region: var("AWS_REGION"),
                model_id: var("CLAUDE_MODEL_ID"),
                api_key: var("AWS_BEARER_TOKEN_BEDROCK").map(ApiKey),
                endpoint: var("BEDROCK_ENDPOINT"),
                max_tokens,
                temperature: TEMPERATURE,
                timeout: INFERENCE_TIMEOUT,
            },
        }
    }
}

#[cfg(test)]
impl InferenceConfig {
    pub(crate) fn for_endpoint(endpoint: &str) -> Self {
        Self {
            region: Some("us-east-1".to_string()),
            model_id: Some("anthropic.claude-3-haiku-20240307-v1:0".to_string()),
            api_key: Some(ApiKey("test-key".to_string())),
            endpoint: Some(endpoint.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: TEMPERATURE,
            timeout: Duration::from_secs(5),
        }
    }
}
