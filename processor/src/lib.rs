//! The `aws_bedrock_chat` processor: renders a prompt from each message, sends
//! it to a Bedrock model through the Converse API and replaces the message
//! payload with the model's text response.

pub mod bedrock;
pub mod client;
pub mod config;
pub mod error;
pub mod processor;

pub use bedrock::BedrockChatCompletion;
pub use client::{ConverseClient, ConverseReply};
pub use config::{CredentialsConfig, ProcessorConfig, SessionConfig};
pub use error::{ConfigError, ProcessorError};
pub use processor::{BedrockChatProcessor, Processor, extract_text};
