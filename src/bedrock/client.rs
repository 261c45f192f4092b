use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{
    ApiError, ContentBlock, ConverseRequest, ConverseResponse, InferenceParams, Message,
};
use crate::config::{ApiKey, InferenceConfig};

/// Model ids and ARNs contain `:` and `/`, which must not split the path.
const MODEL_ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("{0} not set; configure the Bedrock inference backend")]
    NotConfigured(&'static str),

    #[error("BEDROCK_ENDPOINT must be an https URL (plain http only for loopback): {0}")]
    InsecureEndpoint(String),

    #[error("Bedrock rejected credentials ({code}): {message}")]
    Unauthorized { code: u16, message: String },

    #[error("Bedrock rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("Bedrock API error ({code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("malformed Bedrock response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Abstraction over a chat-completion backend.
/// Implemented by `BedrockClient` for production; mock implementations used in tests.
pub trait ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

pub struct BedrockClient {
    http: Client,
    config: InferenceConfig,
}

/// Resolved request target: everything `complete` needs beyond the prompt.
struct Target<'a> {
    url: String,
    api_key: &'a ApiKey,
}

impl BedrockClient {
    pub fn new(http: Client, config: &InferenceConfig) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    fn target(&self) -> Result<Target<'_>, InferenceError> {
        let model_id = self
            .config
            .model_id
            .as_deref()
            .ok_or(InferenceError::NotConfigured("CLAUDE_MODEL_ID"))?;
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(InferenceError::NotConfigured("AWS_BEARER_TOKEN_BEDROCK"))?;
        let endpoint = match (&self.config.endpoint, &self.config.region) {
            (Some(endpoint), _) => {
                check_endpoint(endpoint)?;
                endpoint.trim_end_matches('/').to_string()
            }
            (None, Some(region)) => format!("https://bedrock-runtime.{region}.amazonaws.com"),
            (None, None) => return Err(InferenceError::NotConfigured("AWS_REGION")),
        };
        let url = format!(
            "{endpoint}/model/{}/converse",
            utf8_percent_encode(model_id, MODEL_ID_ENCODE_SET)
        );
        Ok(Target { url, api_key })
    }

    async fn converse(&self, prompt: &str) -> Result<ConverseResponse, InferenceError> {
        let target = self.target()?;

        let request = ConverseRequest {
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![ContentBlock {
                    text: Some(prompt.to_string()),
                }],
            }],
            inference_config: InferenceParams {
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http
            .post(&target.url)
            .bearer_auth(target.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let classified = classify_status(status.as_u16(), &text);
            warn!(error = %classified, "Bedrock API error");
            return Err(classified);
        }

        let text = response.text().await?;
        let body: ConverseResponse = serde_json::from_str(&text)
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        debug!(stop_reason = ?body.stop_reason, "bedrock converse complete");
        Ok(body)
    }
}

impl ChatClient for BedrockClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let response = self.converse(prompt).await?;
        extract_answer(&response)
            .ok_or_else(|| InferenceError::MalformedResponse("no text in output message".into()))
    }
}

/// The bearer key must not travel in cleartext beyond this machine.
fn check_endpoint(endpoint: &str) -> Result<(), InferenceError> {
    let insecure = || InferenceError::InsecureEndpoint(endpoint.to_string());
    let parsed = url::Url::parse(endpoint).map_err(|_| insecure())?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        _ => Err(insecure()),
    }
}

fn is_loopback(parsed: &url::Url) -> bool {
    match parsed.host() {
        Some(url::Host::Ipv4(v4)) => v4.is_loopback(),
        Some(url::Host::Ipv6(v6)) => v6.is_loopback(),
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

/// Text of the first text-bearing block in the output message. Non-text
/// blocks before it are skipped; an empty first text counts as no answer.
fn extract_answer(response: &ConverseResponse) -> Option<String> {
    response
        .output
        .as_ref()
        .and_then(|o| o.message.as_ref())
        .and_then(|m| m.content.iter().find_map(|block| block.text.as_ref()))
        .filter(|text| !text.is_empty())
        .cloned()
}

fn classify_status(code: u16, body: &str) -> InferenceError {
    let message = serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            let end = body.floor_char_boundary(200);
            format!("HTTP {code}: {}", &body[..end])
        });

    match code {
        429 => InferenceError::RateLimited,
        401 | 403 => InferenceError::Unauthorized { code, message },
        _ => InferenceError::Rejected { code, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::types::ConverseOutput;

    fn response_with(blocks: Vec<Option<&str>>) -> ConverseResponse {
        ConverseResponse {
            output: Some(ConverseOutput {
                message: Some(Message {
                    role: "assistant".into(),
                    content: blocks
                        .into_iter()
                        .map(|t| ContentBlock {
                            text: t.map(str::to_string),
                        })
                        .collect(),
                }),
            }),
            stop_reason: Some("end_turn".into()),
        }
    }

    #[test]
    fn extracts_first_text_block() {
        let response = response_with(vec![None, Some("Bonjour !"), Some("ignored")]);
        assert_eq!(extract_answer(&response).as_deref(), Some("Bonjour !"));
    }

    #[test]
    fn missing_output_has_no_answer() {
        let response = ConverseResponse {
            output: None,
            stop_reason: None,
        };
        assert!(extract_answer(&response).is_none());
        assert!(extract_answer(&response_with(vec![])).is_none());
        assert!(extract_answer(&response_with(vec![Some("")])).is_none());
    }

    #[test]
    fn empty_first_text_after_non_text_block_has_no_answer() {
        let response = response_with(vec![None, Some(""), Some("later text")]);
        assert!(extract_answer(&response).is_none());
    }

    #[test]
    fn classify_uses_json_message() {
        match classify_status(400, r#"{"message":"The provided model identifier is invalid."}"#) {
            InferenceError::Rejected { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "The provided model identifier is invalid.");
            }
            other => panic!("expected Rejected, got: {other:?}"),
        }
    }

    #[test]
    fn classify_auth_failures() {
        assert!(matches!(
            classify_status(403, r#"{"Message":"denied"}"#),
            InferenceError::Unauthorized { code: 403, .. }
        ));
        assert!(matches!(
            classify_status(401, ""),
            InferenceError::Unauthorized { code: 401, .. }
        ));
    }

    #[test]
    fn classify_truncates_plain_body() {
        let body = "é".repeat(300);
        match classify_status(502, &body) {
            InferenceError::Rejected { message, .. } => {
                assert!(message.starts_with("HTTP 502: é"));
                assert!(message.len() <= "HTTP 502: ".len() + 200);
            }
            other => panic!("expected Rejected, got: {other:?}"),
        }
    }

    #[test]
    fn missing_settings_are_reported_by_name() {
        let mut config = InferenceConfig::for_endpoint("http://unused");
        config.model_id = None;
        let client = BedrockClient::new(Client::new(), &config);
        assert!(matches!(
            client.target(),
            Err(InferenceError::NotConfigured("CLAUDE_MODEL_ID"))
        ));

        let mut config = InferenceConfig::for_endpoint("http://unused");
        config.endpoint = None;
        config.region = None;
        let client = BedrockClient::new(Client::new(), &config);
        assert!(matches!(
            client.target(),
            Err(InferenceError::NotConfigured("AWS_REGION"))
        ));

        let mut config = InferenceConfig::for_endpoint("http://unused");
        config.api_key = None;
        let client = BedrockClient::new(Client::new(), &config);
        assert!(matches!(
            client.target(),
            Err(InferenceError::NotConfigured("AWS_BEARER_TOKEN_BEDROCK"))
        ));
    }

    #[test]
    fn plain_http_endpoint_is_rejected_unless_loopback() {
        for endpoint in ["http://bedrock.example.com", "ftp://127.0.0.1", "not a url"] {
            let client =
                BedrockClient::new(Client::new(), &InferenceConfig::for_endpoint(endpoint));
            assert!(
                matches!(client.target(), Err(InferenceError::InsecureEndpoint(_))),
                "endpoint {endpoint}"
            );
        }

        for endpoint in [
            "https://bedrock.example.com",
            "http://127.0.0.1:9",
            "http://localhost:4566/",
            "http://[::1]:8080",
        ] {
            let client =
                BedrockClient::new(Client::new(), &InferenceConfig::for_endpoint(endpoint));
            assert!(client.target().is_ok(), "endpoint {endpoint}");
        }
    }

    #[tokio::test]
    async fn insecure_endpoint_fails_without_sending() {
        let client = BedrockClient::new(
            Client::new(),
            &InferenceConfig::for_endpoint("http://bedrock.example.com"),
        );
        let result = client.complete("prompt").await;
        assert!(matches!(result, Err(InferenceError::InsecureEndpoint(_))));
    }

    #[test]
    fn regional_endpoint_with_encoded_model_id() {
        let mut config = InferenceConfig::for_endpoint("http://unused");
        config.endpoint = None;
        config.region = Some("eu-central-1".into());
        let client = BedrockClient::new(Client::new(), &config);
        let target = client.target().unwrap();
        assert_eq!(
            target.url,
            "https://bedrock-runtime.eu-central-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/converse"
        );
    }
}
