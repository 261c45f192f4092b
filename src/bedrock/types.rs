use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<Message>,
    pub inference_config: InferenceParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// Only text blocks are read; other block kinds deserialize with `text: None`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub output: Option<ConverseOutput>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConverseOutput {
    pub message: Option<Message>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(alias = "Message")]
    pub message: Option<String>,
}
