//! Chat completion through the Amazon Bedrock Converse API.

pub mod client;
pub mod types;

pub use client::{BedrockClient, ChatClient, InferenceError};
